use crate::console::Console;
use crate::error::RunError;
use crate::mem::MEMORY_MAX;
use crate::reg::Reg;
use crate::runtime::{RunState, Status};

/// Printed by `IN` before waiting for a character.
pub const IN_PROMPT: &str = "Enter a character: ";
/// Printed by `HALT`.
pub const HALT_NOTICE: &str = "HALT\n";

/// Stored in R0 when input ends during `GETC` or `IN`.
const END_OF_INPUT: u16 = 0xFFFF;

/// Operating system services reachable through `TRAP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVect {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

impl From<u8> for TrapVect {
    /// Unknown vectors behave as `HALT`.
    fn from(vect: u8) -> Self {
        match vect {
            0x20 => Self::Getc,
            0x21 => Self::Out,
            0x22 => Self::Puts,
            0x23 => Self::In,
            0x24 => Self::Putsp,
            _ => Self::Halt,
        }
    }
}

impl RunState {
    pub(crate) fn trap(&mut self, vect: u8, console: &mut dyn Console) -> Result<(), RunError> {
        match TrapVect::from(vect) {
            TrapVect::Getc => {
                self.regs[Reg::R0] = read_char(console);
            }
            TrapVect::Out => {
                let chr = (self.regs[Reg::R0] & 0xFF) as u8;
                console.write_bytes(&[chr])?;
                console.flush()?;
            }
            TrapVect::Puts => {
                let string = self.string_at(self.regs[Reg::R0]);
                console.write_bytes(&string)?;
                console.flush()?;
            }
            TrapVect::In => {
                console.write_bytes(IN_PROMPT.as_bytes())?;
                console.flush()?;
                let ch = read_char(console);
                if ch != END_OF_INPUT {
                    console.write_bytes(&[ch as u8])?;
                }
                self.regs[Reg::R0] = ch;
                console.flush()?;
            }
            TrapVect::Putsp => {
                let string = self.packed_string_at(self.regs[Reg::R0]);
                console.write_bytes(&string)?;
                console.flush()?;
            }
            TrapVect::Halt => {
                console.write_bytes(HALT_NOTICE.as_bytes())?;
                console.flush()?;
                self.status = Status::Halted;
            }
        }
        Ok(())
    }

    /// Addresses from `start` onwards, visiting each cell at most once.
    fn cells_from(&self, start: u16) -> impl Iterator<Item = u16> + '_ {
        (0..MEMORY_MAX).map(move |i| self.mem.peek(start.wrapping_add(i as u16)))
    }

    /// One character per word, low byte only, up to the first zero word.
    fn string_at(&self, start: u16) -> Vec<u8> {
        self.cells_from(start)
            .take_while(|&cell| cell != 0)
            .map(|cell| (cell & 0xFF) as u8)
            .collect()
    }

    /// Two characters per word, low byte first, up to the first zero byte.
    fn packed_string_at(&self, start: u16) -> Vec<u8> {
        self.cells_from(start)
            .flat_map(|cell| [(cell & 0xFF) as u8, (cell >> 8) as u8])
            .take_while(|&chr| chr != 0)
            .collect()
    }
}

fn read_char(console: &mut dyn Console) -> u16 {
    console.read_byte().map_or(END_OF_INPUT, u16::from)
}
