use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lc3vm::error::{self, exit, RunError};
use lc3vm::output::{self, file_message, message, MsgColor};
use lc3vm::{Image, RunState, TermConsole, PC_START};

/// Run compiled LC3 program images in a virtual machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Binary `.obj` images to load, in order. Later images overwrite earlier ones
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    lc3vm::env::init();
    output::set_minimal(args.minimal || lc3vm::env::is_minimal());

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        file_message(MsgColor::Green, "Loading", path);
        match Image::read(path) {
            Ok(image) => images.push(image),
            Err(e) => {
                eprintln!("{:?}", error::load_report(&e));
                return ExitCode::from(exit::LOAD);
            }
        }
    }

    let mut state = RunState::new();
    for image in &images {
        let count = state.load(image);
        let range = match image.end() {
            Some(end) => format!("0x{:04x}..=0x{end:04x}", image.origin()),
            None => format!("0x{:04x}", image.origin()),
        };
        message(
            MsgColor::Cyan,
            "Loaded",
            format_args!("{count} words at {range}"),
        );
    }

    message(
        MsgColor::Green,
        "Running",
        format_args!("from 0x{PC_START:04x}"),
    );
    match run(&mut state) {
        Ok(()) => {
            message(MsgColor::Green, "Completed", "halted");
            ExitCode::from(exit::SUCCESS)
        }
        Err(e) => {
            if matches!(e, RunError::Interrupted) {
                message(MsgColor::Red, "Interrupted", "stopped by user");
            }
            eprintln!("{:?}", error::run_report(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

/// Console only lives for the duration of this call, so the terminal is restored before
/// anything else is printed.
fn run(state: &mut RunState) -> Result<(), RunError> {
    let mut console = TermConsole::new()?;
    state.run(&mut console)
}
