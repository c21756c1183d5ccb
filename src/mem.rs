use crate::console::Console;
use crate::image::Image;

/// LC3 addresses 65536 words, 128KB in total.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Top bit set when a character is ready.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Holds the character found by the last status read.
pub const KBDR: u16 = 0xFE02;

/// Main memory, including the memory-mapped keyboard registers.
///
/// Every `u16` is a valid address, so address arithmetic elsewhere is done with wrapping
/// `u16` operations and never needs a bounds check here.
pub struct Memory {
    cells: Box<[u16]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: vec![0; MEMORY_MAX].into_boxed_slice(),
        }
    }

    /// Copy an image into memory starting at its origin.
    ///
    /// Words which would land past `0xFFFF` are dropped. Returns the amount of words written.
    pub fn load(&mut self, image: &Image) -> usize {
        let orig = image.origin() as usize;
        let count = image.words().len().min(MEMORY_MAX - orig);
        self.cells[orig..orig + count].copy_from_slice(&image.words()[..count]);
        count
    }

    /// Read a word as the running program sees it.
    ///
    /// Reading [`KBSR`] polls the console, refreshing both keyboard registers.
    pub fn read(&mut self, addr: u16, console: &mut dyn Console) -> u16 {
        if addr == KBSR {
            match console.poll_byte() {
                Some(ch) => {
                    self.cells[KBSR as usize] = 1 << 15;
                    self.cells[KBDR as usize] = ch as u16;
                }
                None => self.cells[KBSR as usize] = 0,
            }
        }
        self.cells[addr as usize]
    }

    /// Read a word without touching any device.
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    pub fn write(&mut self, addr: u16, val: u16) {
        self.cells[addr as usize] = val;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
