use std::collections::VecDeque;
use std::io;

/// Character device the machine talks to through traps and the keyboard registers.
pub trait Console {
    /// Block until a character is available.
    ///
    /// Returns `None` if input has ended or the console was interrupted while waiting.
    fn read_byte(&mut self) -> Option<u8>;

    /// Take a character only if one is ready right now.
    fn poll_byte(&mut self) -> Option<u8>;

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Whether a stop request has arrived. Checked between instructions.
    fn is_interrupted(&self) -> bool {
        false
    }
}

/// Console reading from an input queue and writing to an output buffer.
///
/// Every queued byte counts as immediately available to `poll_byte`.
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    interrupted: bool,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Request a stop, as an external signal would.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }
}

impl Console for BufferedConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn poll_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}
