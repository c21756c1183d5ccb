use crate::console::Console;
use crate::error::RunError;
use crate::image::Image;
use crate::instr::{Instr, JsrTarget, Operand};
use crate::mem::Memory;
use crate::reg::{Flag, Reg, RegisterFile};

/// Conventional start of user programs.
pub const PC_START: u16 = 0x3000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Reached through a `HALT` trap. Never left again.
    Halted,
}

/// Represents complete machine state during runtime.
pub struct RunState {
    pub(crate) mem: Memory,
    pub(crate) regs: RegisterFile,
    pub(crate) status: Status,
}

impl RunState {
    pub fn new() -> Self {
        RunState {
            mem: Memory::new(),
            regs: RegisterFile::new(PC_START),
            status: Status::Running,
        }
    }

    /// Build a machine from images, loaded in order so later images overwrite earlier ones.
    pub fn from_images<'a>(images: impl IntoIterator<Item = &'a Image>) -> Self {
        let mut state = RunState::new();
        for image in images {
            state.load(image);
        }
        state
    }

    pub fn load(&mut self, image: &Image) -> usize {
        self.mem.load(image)
    }

    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Panics if `reg` is not in `0..8`.
    pub fn reg(&self, reg: usize) -> u16 {
        self.regs.as_slice()[reg]
    }

    /// Panics if `reg` is not in `0..8`.
    pub fn set_reg(&mut self, reg: usize, val: u16) {
        self.regs.as_mut_slice()[reg] = val;
    }

    pub fn flag(&self) -> Flag {
        self.regs.flag()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Run until `HALT`, an illegal instruction, or an interrupt.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), RunError> {
        while self.status == Status::Running {
            if console.is_interrupted() {
                return Err(RunError::Interrupted);
            }
            self.step(console)?;
        }
        Ok(())
    }

    /// Fetch, decode and execute a single instruction. Does nothing once halted.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<(), RunError> {
        if self.status == Status::Halted {
            return Ok(());
        }
        let addr = self.regs.pc;
        let word = self.mem.read(addr, console);
        // PC incremented before instruction is performed
        self.regs.pc = addr.wrapping_add(1);
        let instr =
            Instr::try_from(word).map_err(|opcode| RunError::IllegalInstruction { addr, opcode })?;
        self.execute(instr, console)
    }

    fn execute(&mut self, instr: Instr, console: &mut dyn Console) -> Result<(), RunError> {
        match instr {
            Instr::Br { mask, offset } => self.br(mask, offset),
            Instr::Add { dr, sr, src } => self.add(dr, sr, src),
            Instr::Ld { dr, offset } => self.ld(dr, offset, console),
            Instr::St { sr, offset } => self.st(sr, offset),
            Instr::Jsr { target } => self.jsr(target),
            Instr::And { dr, sr, src } => self.and(dr, sr, src),
            Instr::Ldr { dr, base, offset } => self.ldr(dr, base, offset, console),
            Instr::Str { sr, base, offset } => self.str(sr, base, offset),
            Instr::Not { dr, sr } => self.not(dr, sr),
            Instr::Ldi { dr, offset } => self.ldi(dr, offset, console),
            Instr::Sti { sr, offset } => self.sti(sr, offset, console),
            Instr::Jmp { base } => self.regs.pc = self.regs[base],
            Instr::Lea { dr, offset } => self.lea(dr, offset),
            Instr::Trap { vect } => return self.trap(vect, console),
        }
        Ok(())
    }

    #[inline]
    fn pc_offset(&self, offset: u16) -> u16 {
        self.regs.pc.wrapping_add(offset)
    }

    fn operand(&self, src: Operand) -> u16 {
        match src {
            Operand::Reg(reg) => self.regs[reg],
            Operand::Imm(imm) => imm,
        }
    }

    fn add(&mut self, dr: Reg, sr: Reg, src: Operand) {
        let res = self.regs[sr].wrapping_add(self.operand(src));
        self.regs.set_with_flags(dr, res);
    }

    fn and(&mut self, dr: Reg, sr: Reg, src: Operand) {
        let res = self.regs[sr] & self.operand(src);
        self.regs.set_with_flags(dr, res);
    }

    fn not(&mut self, dr: Reg, sr: Reg) {
        let res = !self.regs[sr];
        self.regs.set_with_flags(dr, res);
    }

    fn br(&mut self, mask: u16, offset: u16) {
        if self.regs.flag().bits() & mask != 0 {
            self.regs.pc = self.pc_offset(offset);
        }
    }

    fn jsr(&mut self, target: JsrTarget) {
        let dest = match target {
            JsrTarget::Offset(offset) => self.pc_offset(offset),
            // Base is read before R7 is overwritten, so `JSRR R7` works
            JsrTarget::Base(base) => self.regs[base],
        };
        self.regs[Reg::R7] = self.regs.pc;
        self.regs.pc = dest;
    }

    fn ld(&mut self, dr: Reg, offset: u16, console: &mut dyn Console) {
        let val = self.mem.read(self.pc_offset(offset), console);
        self.regs.set_with_flags(dr, val);
    }

    fn ldi(&mut self, dr: Reg, offset: u16, console: &mut dyn Console) {
        let ptr = self.mem.read(self.pc_offset(offset), console);
        let val = self.mem.read(ptr, console);
        self.regs.set_with_flags(dr, val);
    }

    fn ldr(&mut self, dr: Reg, base: Reg, offset: u16, console: &mut dyn Console) {
        let addr = self.regs[base].wrapping_add(offset);
        let val = self.mem.read(addr, console);
        self.regs.set_with_flags(dr, val);
    }

    fn lea(&mut self, dr: Reg, offset: u16) {
        let val = self.pc_offset(offset);
        self.regs.set_with_flags(dr, val);
    }

    fn st(&mut self, sr: Reg, offset: u16) {
        self.mem.write(self.pc_offset(offset), self.regs[sr]);
    }

    fn sti(&mut self, sr: Reg, offset: u16, console: &mut dyn Console) {
        let ptr = self.mem.read(self.pc_offset(offset), console);
        self.mem.write(ptr, self.regs[sr]);
    }

    fn str(&mut self, sr: Reg, base: Reg, offset: u16) {
        let addr = self.regs[base].wrapping_add(offset);
        self.mem.write(addr, self.regs[sr]);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferedConsole;
    use crate::mem::{KBDR, KBSR};

    const HALT: u16 = 0xf025;

    fn machine(words: &[u16]) -> RunState {
        RunState::from_images([&Image::new(PC_START, words.to_vec())])
    }

    fn step_n(state: &mut RunState, n: usize) {
        let mut console = BufferedConsole::new();
        for _ in 0..n {
            state.step(&mut console).unwrap();
        }
    }

    #[test]
    fn and_then_add_immediate() {
        // AND R0, R0, #0; ADD R0, R0, #5
        let mut state = machine(&[0x5020, 0x1025]);
        state.set_reg(0, 0x1234);
        step_n(&mut state, 2);
        assert_eq!(state.reg(0), 5);
        assert_eq!(state.flag(), Flag::P);
        assert_eq!(state.pc(), 0x3002);
    }

    #[test]
    #[should_panic]
    fn set_reg_out_of_range_panics() {
        let mut state = RunState::new();
        state.set_reg(8, 1);
    }

    #[test]
    fn add_register_wraps() {
        // ADD R3, R1, R2
        let mut state = machine(&[0x1642]);
        state.set_reg(1, 0xffff);
        state.set_reg(2, 0x0001);
        step_n(&mut state, 1);
        assert_eq!(state.reg(3), 0);
        assert_eq!(state.flag(), Flag::Z);
    }

    #[test]
    fn not_sets_negative() {
        // NOT R2, R1
        let mut state = machine(&[0x947f]);
        state.set_reg(1, 0x00ff);
        step_n(&mut state, 1);
        assert_eq!(state.reg(2), 0xff00);
        assert_eq!(state.flag(), Flag::N);
    }

    #[test]
    fn branch_taken_and_not_taken() {
        // ADD R1, R1, #-1; BRn #2
        let mut state = machine(&[0x127f, 0x0802]);
        step_n(&mut state, 2);
        assert_eq!(state.pc(), 0x3004);

        // ADD R1, R1, #-1; BRp #2
        let mut state = machine(&[0x127f, 0x0202]);
        step_n(&mut state, 2);
        assert_eq!(state.pc(), 0x3002);
    }

    #[test]
    fn branch_before_any_flag_update_is_not_taken() {
        // BRnzp #5
        let mut state = machine(&[0x0e05]);
        step_n(&mut state, 1);
        assert_eq!(state.pc(), 0x3001);
    }

    #[test]
    fn branch_backwards() {
        // AND R0, R0, #0; BRz #-2
        let mut state = machine(&[0x5020, 0x05fe]);
        step_n(&mut state, 2);
        assert_eq!(state.pc(), 0x3000);
    }

    #[test]
    fn jsr_saves_return_address() {
        // JSR #4
        let mut state = machine(&[0x4804]);
        step_n(&mut state, 1);
        assert_eq!(state.reg(7), 0x3001);
        assert_eq!(state.pc(), 0x3005);

        // JSRR R2
        let mut state = machine(&[0x4080]);
        state.set_reg(2, 0x4000);
        step_n(&mut state, 1);
        assert_eq!(state.reg(7), 0x3001);
        assert_eq!(state.pc(), 0x4000);

        // JSRR R7
        let mut state = machine(&[0x41c0]);
        state.set_reg(7, 0x5000);
        step_n(&mut state, 1);
        assert_eq!(state.reg(7), 0x3001);
        assert_eq!(state.pc(), 0x5000);
    }

    #[test]
    fn jmp_and_flags_untouched() {
        // ADD R0, R0, #-1; JMP R3
        let mut state = machine(&[0x103f, 0xc0c0]);
        state.set_reg(3, 0x1234);
        step_n(&mut state, 2);
        assert_eq!(state.pc(), 0x1234);
        assert_eq!(state.flag(), Flag::N);
    }

    #[test]
    fn loads() {
        // LD R1, #3; LDI R2, #3; LDR R3, R4, #-1; LEA R5, #-1
        let mut state = machine(&[0x2203, 0xa403, 0x673f, 0xebff]);
        state.mem_mut().write(0x3004, 0x0042);
        // LDI pointer
        state.mem_mut().write(0x3005, 0x4000);
        state.mem_mut().write(0x4000, 0x8001);
        state.set_reg(4, 0x4001);

        step_n(&mut state, 1);
        assert_eq!(state.reg(1), 0x0042);
        assert_eq!(state.flag(), Flag::P);

        step_n(&mut state, 1);
        assert_eq!(state.reg(2), 0x8001);
        assert_eq!(state.flag(), Flag::N);

        step_n(&mut state, 1);
        assert_eq!(state.reg(3), 0x8001);

        step_n(&mut state, 1);
        assert_eq!(state.reg(5), 0x3003);
        assert_eq!(state.flag(), Flag::P);
    }

    #[test]
    fn stores_do_not_touch_flags() {
        // ST R1, #3; STI R1, #3; STR R1, R2, #3
        let mut state = machine(&[0x3203, 0xb203, 0x7283]);
        state.set_reg(1, 0xabcd);
        state.set_reg(2, 0x5000);
        // STI pointer at 0x3002 + 3
        state.mem_mut().write(0x3005, 0x6000);
        step_n(&mut state, 3);

        assert_eq!(state.mem().peek(0x3004), 0xabcd);
        assert_eq!(state.mem().peek(0x6000), 0xabcd);
        assert_eq!(state.mem().peek(0x5003), 0xabcd);
        assert_eq!(state.flag(), Flag::Uninit);
    }

    #[test]
    fn addresses_wrap() {
        // LDR R1, R2, #2
        let mut state = machine(&[0x6282]);
        state.set_reg(2, 0xffff);
        state.mem_mut().write(0x0001, 0x0042);
        step_n(&mut state, 1);
        assert_eq!(state.reg(1), 0x0042);
    }

    #[test]
    fn halt_stops_execution() {
        // HALT; ADD R0, R0, #1
        let mut state = machine(&[HALT, 0x1021]);
        let mut console = BufferedConsole::new();
        state.run(&mut console).unwrap();
        assert_eq!(state.status(), Status::Halted);
        assert_eq!(state.pc(), 0x3001);

        state.run(&mut console).unwrap();
        state.step(&mut console).unwrap();
        assert_eq!(state.reg(0), 0);
        assert_eq!(state.pc(), 0x3001);
        assert_eq!(console.output(), b"HALT\n");
    }

    #[test]
    fn illegal_opcode_stops_without_side_effects() {
        for word in [0xd000, 0x8000] {
            let mut state = machine(&[word]);
            state.set_reg(3, 7);
            let regs_before = state.regs.clone();
            let mut console = BufferedConsole::new();

            let err = state.run(&mut console).unwrap_err();
            match err {
                RunError::IllegalInstruction { addr, opcode } => {
                    assert_eq!(addr, 0x3000);
                    assert_eq!(opcode.instr, word);
                }
                other => panic!("unexpected error {other:?}"),
            }
            assert_eq!(state.pc(), 0x3001);
            assert_eq!(state.regs.as_slice(), regs_before.as_slice());
            assert_eq!(state.flag(), regs_before.flag());
            assert_eq!(state.mem().peek(0x3000), word);
            assert!(console.output().is_empty());
        }
    }

    #[test]
    fn interrupt_stops_before_next_instruction() {
        // ADD R0, R0, #1; HALT
        let mut state = machine(&[0x1021, HALT]);
        let mut console = BufferedConsole::new();
        console.interrupt();
        assert!(matches!(
            state.run(&mut console),
            Err(RunError::Interrupted)
        ));
        assert_eq!(state.pc(), 0x3000);
        assert_eq!(state.reg(0), 0);
        assert_eq!(state.status(), Status::Running);
    }

    #[test]
    fn keyboard_polling_loop() {
        let mut state = machine(&[
            0xa004, // LDI R0, KBSR_PTR
            0x07fe, // BRzp #-2
            0xa003, // LDI R0, KBDR_PTR
            0xf021, // OUT
            HALT,
            KBSR,   // KBSR_PTR
            KBDR,   // KBDR_PTR
        ]);
        let mut console = BufferedConsole::with_input("k");
        state.run(&mut console).unwrap();
        assert_eq!(console.output(), b"kHALT\n");
        assert_eq!(state.reg(0), b'k' as u16);
    }

    #[test]
    fn later_images_overwrite_earlier() {
        let first = Image::new(0x3000, vec![0x1021, 0x1021, 0x1021]);
        let second = Image::new(0x3001, vec![HALT]);
        let mut state = RunState::from_images([&first, &second]);
        state.run(&mut BufferedConsole::new()).unwrap();
        assert_eq!(state.reg(0), 1);
    }
}
