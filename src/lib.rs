// Machine
mod instr;
pub use instr::{sign_extend, IllegalOpcode, Instr, JsrTarget, Operand};
mod mem;
pub use mem::{Memory, KBDR, KBSR, MEMORY_MAX};
mod reg;
pub use reg::{Flag, Reg, RegisterFile};
mod runtime;
pub use runtime::{RunState, Status, PC_START};
mod trap;
pub use trap::{TrapVect, HALT_NOTICE, IN_PROMPT};

// Collaborators
mod console;
pub use console::{BufferedConsole, Console};
mod term;
pub use term::{RawMode, TermConsole};
mod image;
pub use image::Image;

pub mod env;
pub mod error;
pub mod output;
