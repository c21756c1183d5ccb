use std::io::{self, BufReader, IsTerminal, Read, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel as cbc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers as Mod};
use crossterm::terminal;

use crate::console::Console;

/// Interactive terminal in raw mode: no line buffering, no local echo.
///
/// The previous mode is restored when this is dropped, on every exit path which unwinds.
#[derive(Debug)]
pub struct RawMode {
    _private: (),
}

impl RawMode {
    /// Must only be called if terminal is NOT in raw mode.
    pub fn enable() -> io::Result<Self> {
        debug_assert!(
            !terminal::is_raw_mode_enabled().is_ok_and(|is| is),
            "terminal should not be in raw mode to enable raw mode",
        );
        terminal::enable_raw_mode()?;
        Ok(RawMode { _private: () })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        // Nothing sensible left to do if this fails
        let _ = terminal::disable_raw_mode();
    }
}

/// Relevant information from a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum Key {
    /// `Ctrl+C`. Stops the machine instead of being delivered to it.
    Interrupt,
    Char(char),
    Byte(u8),
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        match event {
            Event::Key(event) => event.try_into(),
            _ => Err(()),
        }
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,
            // Other control characters, eg. Ctrl+D
            (Mod::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => {
                Key::Byte(ch.to_ascii_lowercase() as u8 & 0x1F)
            }

            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Byte(b'\n'),
            (_, KeyCode::Tab) => Key::Byte(b'\t'),
            (_, KeyCode::Backspace) => Key::Byte(0x7F),
            (_, KeyCode::Esc) => Key::Byte(0x1B),

            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return Err(()),
        };
        Ok(key)
    }
}

/// Console attached to the process's stdin and stdout.
///
/// Input is gathered by a watcher thread and handed over through a channel, so the
/// machine can poll for a key without blocking. When stdin is an interactive terminal,
/// it is put in raw mode for as long as this console lives and `Ctrl+C` raises the
/// interrupt flag. Otherwise bytes are forwarded from stdin as they arrive.
pub struct TermConsole {
    input: cbc::Receiver<u8>,
    /// Signalled on interrupt, to wake a blocked read.
    stop: cbc::Receiver<()>,
    stdout: Stdout,
    interrupted: Arc<AtomicBool>,
    raw: Option<RawMode>,
}

impl TermConsole {
    /// Also installs the process's `SIGINT` handler, so must only be called once.
    pub fn new() -> io::Result<Self> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let (sender, input) = cbc::unbounded();
        let (stop_sender, stop) = cbc::unbounded();

        let interrupt = Interrupt {
            flag: Arc::clone(&interrupted),
            stop: stop_sender,
        };
        let on_signal = interrupt.clone();
        ctrlc::set_handler(move || on_signal.raise()).map_err(io::Error::other)?;

        let raw = if io::stdin().is_terminal() {
            let raw = RawMode::enable()?;
            thread::spawn(move || watch_keys(sender, interrupt));
            Some(raw)
        } else {
            thread::spawn(move || watch_stdin(sender));
            None
        };

        Ok(TermConsole {
            input,
            stop,
            stdout: io::stdout(),
            interrupted,
            raw,
        })
    }
}

impl Console for TermConsole {
    fn read_byte(&mut self) -> Option<u8> {
        if self.is_interrupted() {
            return None;
        }
        cbc::select! {
            // Disconnected once input ends
            recv(self.input) -> byte => byte.ok(),
            recv(self.stop) -> _ => None,
        }
    }

    fn poll_byte(&mut self) -> Option<u8> {
        self.input.try_recv().ok()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdout = self.stdout.lock();
        if self.raw.is_some() {
            write_raw(&mut stdout, bytes)
        } else {
            stdout.write_all(bytes)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Stop request shared by the signal handler and the key watcher.
#[derive(Clone)]
struct Interrupt {
    flag: Arc<AtomicBool>,
    stop: cbc::Sender<()>,
}

impl Interrupt {
    fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.stop.send(());
    }
}

/// Raw mode disables output post-processing, so line feeds need an explicit carriage return.
fn write_raw(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    for line in bytes.split_inclusive(|&b| b == b'\n') {
        match line.strip_suffix(b"\n") {
            Some(line) => {
                out.write_all(line)?;
                out.write_all(b"\r\n")?;
            }
            None => out.write_all(line)?,
        }
    }
    Ok(())
}

/// Forward key presses as bytes. Returns, dropping `sender`, on `Ctrl+C` or a read failure.
fn watch_keys(sender: cbc::Sender<u8>, interrupt: Interrupt) {
    while let Ok(event) = event::read() {
        let bytes = match Key::try_from(event) {
            Ok(Key::Interrupt) => {
                interrupt.raise();
                return;
            }
            Ok(Key::Byte(byte)) => vec![byte],
            // Multi-byte characters are delivered one UTF-8 byte at a time
            Ok(Key::Char(ch)) => ch.to_string().into_bytes(),
            Err(()) => continue,
        };
        for byte in bytes {
            if sender.send(byte).is_err() {
                return;
            }
        }
    }
}

/// Forward piped stdin byte by byte until it ends.
fn watch_stdin(sender: cbc::Sender<u8>) {
    let stdin = BufReader::new(io::stdin());
    for byte in stdin.bytes() {
        let Ok(byte) = byte else {
            return;
        };
        if sender.send(byte).is_err() {
            return;
        }
    }
}
