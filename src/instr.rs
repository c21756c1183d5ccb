use std::fmt;

use crate::reg::Reg;

/// Interpret the low `bits` of `val` as two's complement and widen to 16 bits.
///
/// Bits of `val` at or above `bits` are ignored.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits <= 16);
    if bits == 16 {
        return val;
    }
    let sign = val & (1u16 << (bits - 1));
    let magnitude = val & ((1u16 << bits) - 1);
    // Negative: sign bit and everything above it set. Positive: nothing set.
    let extension = (!sign).wrapping_add(1);
    magnitude | extension
}

/// Second operand of `ADD` and `AND`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    /// Already sign extended.
    Imm(u16),
}

/// Destination of `JSR`/`JSRR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsrTarget {
    /// `JSR`: PC-relative, already sign extended.
    Offset(u16),
    /// `JSRR`: absolute address held in a register.
    Base(Reg),
}

/// A decoded instruction word. Offsets are stored sign extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    Br { mask: u16, offset: u16 },
    Add { dr: Reg, sr: Reg, src: Operand },
    Ld { dr: Reg, offset: u16 },
    St { sr: Reg, offset: u16 },
    Jsr { target: JsrTarget },
    And { dr: Reg, sr: Reg, src: Operand },
    Ldr { dr: Reg, base: Reg, offset: u16 },
    Str { sr: Reg, base: Reg, offset: u16 },
    Not { dr: Reg, sr: Reg },
    Ldi { dr: Reg, offset: u16 },
    Sti { sr: Reg, offset: u16 },
    Jmp { base: Reg },
    Lea { dr: Reg, offset: u16 },
    Trap { vect: u8 },
}

/// Instruction word whose opcode is `RTI` (`0x8`) or the reserved `0xD`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IllegalOpcode {
    pub instr: u16,
}

impl IllegalOpcode {
    pub fn opcode(&self) -> u16 {
        self.instr >> 12
    }
}

impl fmt::Display for IllegalOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "illegal opcode 0b{:04b} in instruction 0x{:04x}",
            self.opcode(),
            self.instr
        )
    }
}

impl std::error::Error for IllegalOpcode {}

impl TryFrom<u16> for Instr {
    type Error = IllegalOpcode;

    fn try_from(instr: u16) -> Result<Self, Self::Error> {
        let r9 = Reg::from_field(instr, 9);
        let r6 = Reg::from_field(instr, 6);
        let off6 = sign_extend(instr, 6);
        let off9 = sign_extend(instr, 9);

        // Shared by ADD and AND
        let src = if instr & 0b10_0000 == 0 {
            Operand::Reg(Reg::from_field(instr, 0))
        } else {
            Operand::Imm(sign_extend(instr, 5))
        };

        let decoded = match instr >> 12 {
            0x0 => Instr::Br {
                mask: (instr >> 9) & 0b111,
                offset: off9,
            },
            0x1 => Instr::Add { dr: r9, sr: r6, src },
            0x2 => Instr::Ld { dr: r9, offset: off9 },
            0x3 => Instr::St { sr: r9, offset: off9 },
            0x4 => Instr::Jsr {
                target: if instr & 0x0800 == 0 {
                    JsrTarget::Base(r6)
                } else {
                    JsrTarget::Offset(sign_extend(instr, 11))
                },
            },
            0x5 => Instr::And { dr: r9, sr: r6, src },
            0x6 => Instr::Ldr {
                dr: r9,
                base: r6,
                offset: off6,
            },
            0x7 => Instr::Str {
                sr: r9,
                base: r6,
                offset: off6,
            },
            0x9 => Instr::Not { dr: r9, sr: r6 },
            0xA => Instr::Ldi { dr: r9, offset: off9 },
            0xB => Instr::Sti { sr: r9, offset: off9 },
            0xC => Instr::Jmp { base: r6 },
            0xE => Instr::Lea { dr: r9, offset: off9 },
            0xF => Instr::Trap {
                vect: (instr & 0xFF) as u8,
            },
            // RTI (0x8) and reserved (0xD)
            _ => return Err(IllegalOpcode { instr }),
        };
        Ok(decoded)
    }
}
