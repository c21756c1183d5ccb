use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

/// Selector for one of the 8 general purpose registers.
///
/// Only ever constructed from a 3-bit field, so indexing can't go out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reg(u8);

impl Reg {
    pub const R0: Reg = Reg(0);
    pub const R7: Reg = Reg(7);

    /// Take the 3-bit register field starting at bit `shift` of `instr`.
    pub fn from_field(instr: u16, shift: u32) -> Self {
        Reg(((instr >> shift) & 0b111) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Condition code. Bit layout matches the `nzp` mask of a `BR` instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
    /// No flag-updating instruction has run yet.
    Uninit = 0b000,
}

impl Flag {
    /// Classify a freshly written value.
    pub fn of(val: u16) -> Flag {
        match (val as i16).cmp(&0) {
            Ordering::Less => Flag::N,
            Ordering::Equal => Flag::Z,
            Ordering::Greater => Flag::P,
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

/// General purpose registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    reg: [u16; 8],
    pub pc: u16,
    flag: Flag,
}

impl RegisterFile {
    pub fn new(pc: u16) -> Self {
        RegisterFile {
            reg: [0; 8],
            pc,
            flag: Flag::Uninit,
        }
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// Overwrite the condition code from the sign of `val`.
    pub fn set_flags(&mut self, val: u16) {
        self.flag = Flag::of(val);
    }

    /// Write `val` into `dr` and update the condition code from it.
    pub fn set_with_flags(&mut self, dr: Reg, val: u16) {
        self[dr] = val;
        self.set_flags(val);
    }

    pub fn as_slice(&self) -> &[u16; 8] {
        &self.reg
    }

    pub fn as_mut_slice(&mut self) -> &mut [u16; 8] {
        &mut self.reg
    }
}

impl Index<Reg> for RegisterFile {
    type Output = u16;
    fn index(&self, reg: Reg) -> &u16 {
        &self.reg[reg.index()]
    }
}

impl IndexMut<Reg> for RegisterFile {
    fn index_mut(&mut self, reg: Reg) -> &mut u16 {
        &mut self.reg[reg.index()]
    }
}
