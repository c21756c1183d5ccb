use std::fmt;
use std::io;
use std::path::PathBuf;

use miette::{miette, Report, Severity};

use crate::instr::IllegalOpcode;

/// Process exit statuses, one per failure kind.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const LOAD: u8 = 1;
    /// Matches the status `clap` uses for usage errors.
    pub const USAGE: u8 = 2;
    pub const ILLEGAL_INSTRUCTION: u8 = 5;
    pub const CONSOLE: u8 = 74;
    pub const INTERRUPTED: u8 = 130;
}

// Load errors

#[derive(Debug)]
pub enum LoadErrorKind {
    Io(io::Error),
    /// Fewer than two bytes in the file.
    MissingOrigin,
    /// Odd amount of bytes in the file.
    Unaligned,
}

#[derive(Debug)]
pub struct LoadError {
    pub path: PathBuf,
    pub kind: LoadErrorKind,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::MissingOrigin => write!(f, "file is too short to contain an origin address"),
            Self::Unaligned => write!(f, "file is not aligned to 16 bits"),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to load image {}: {}",
            self.path.display(),
            self.kind
        )
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            LoadErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

// Runtime errors

/// Reasons execution stopped before a `HALT`.
#[derive(Debug)]
pub enum RunError {
    /// Fetched an `RTI` or reserved opcode. `addr` is where the word was fetched from.
    IllegalInstruction { addr: u16, opcode: IllegalOpcode },
    /// Stop requested from outside the machine.
    Interrupted,
    /// Console output could not be written.
    Console(io::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::IllegalInstruction { .. } => exit::ILLEGAL_INSTRUCTION,
            Self::Interrupted => exit::INTERRUPTED,
            Self::Console(_) => exit::CONSOLE,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalInstruction { addr, opcode } => {
                write!(f, "{opcode} at address 0x{addr:04x}")
            }
            Self::Interrupted => write!(f, "execution interrupted"),
            Self::Console(e) => write!(f, "console error: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IllegalInstruction { opcode, .. } => Some(opcode),
            Self::Console(e) => Some(e),
            Self::Interrupted => None,
        }
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        RunError::Console(e)
    }
}

// Reports

pub fn load_report(e: &LoadError) -> Report {
    let help = match e.kind {
        LoadErrorKind::Io(_) => "check that the path exists and is readable",
        _ => "images are a big-endian origin word followed by big-endian program words",
    };
    miette!(
        severity = Severity::Error,
        code = "load::image",
        help = help,
        "Failed to load image {}: {}",
        e.path.display(),
        e.kind,
    )
}

pub fn run_report(e: &RunError) -> Report {
    match e {
        RunError::IllegalInstruction { addr, opcode } => miette!(
            severity = Severity::Error,
            code = "run::illegal_instruction",
            help = "opcodes RTI (0b1000) and 0b1101 are reserved and cannot be executed",
            "Illegal instruction 0x{:04x} at address 0x{addr:04x}",
            opcode.instr,
        ),
        RunError::Interrupted => miette!(
            severity = Severity::Warning,
            code = "run::interrupted",
            "Execution interrupted",
        ),
        RunError::Console(e) => miette!(
            severity = Severity::Error,
            code = "run::console",
            help = "the output stream may have been closed",
            "Failed to write to console: {e}",
        ),
    }
}
