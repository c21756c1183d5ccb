use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

/// Color of the left-hand status word.
#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Suppress status messages. Returns the previous setting.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

/// Print a right-aligned colored status word followed by a description, eg.
/// `     Running 2 images`.
///
/// Goes to stderr, so stdout only ever holds what the program itself printed.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if is_minimal() {
        return;
    }
    eprintln!("{} {right}", status_word(color, left));
}

pub fn file_message(color: MsgColor, left: &str, path: &Path) {
    message(color, left, format_args!("target {}", path.display()));
}

fn status_word(color: MsgColor, left: &str) -> String {
    let left = format!("{left:>12}");
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    left.bold().to_string()
}
