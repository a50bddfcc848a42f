//! Command-line driver: translate one or more source files, then run the
//! resulting image with the requested reference plugins attached.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use tinyvm::prelude::*;

/// A tiny stack-oriented virtual machine and its two-pass mnemonic assembler.
#[derive(Parser, Debug)]
#[command(name = "tinyvm", version, about)]
struct Cli {
    /// Enable the MemOverseer plugin (definedness and bounds warnings).
    #[arg(long = "memoverseer")]
    memoverseer: bool,

    /// Enable the MemoryDump plugin (final register/memory dump).
    #[arg(long = "memorydump")]
    memorydump: bool,

    /// Pause for one byte of input after every instruction.
    #[arg(short = 's', long = "stepbystep")]
    stepbystep: bool,

    /// Source files to translate and run, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let outcome = translate_files(&cli.files);
    if outcome.has_errors() {
        for diagnostic in &outcome.diagnostics {
            eprintln!("{diagnostic}");
        }
        return ExitCode::FAILURE;
    }

    let mut host = PluginHost::new();
    if cli.memoverseer {
        if host.register(Box::new(MemOverseer::new())).is_err() {
            error!("too many plugins registered");
            return ExitCode::FAILURE;
        }
    }
    if cli.memorydump {
        if host.register(Box::new(MemoryDump::new())).is_err() {
            error!("too many plugins registered");
            return ExitCode::FAILURE;
        }
    }

    let mut interpreter = Interpreter::new(outcome.image);
    let options = RunOptions { step_by_step: cli.stepbystep };
    let mut stdin = io::stdin();
    let mut stdout = io::stdout();

    match interpreter.run(options, &mut host, &mut stdin, &mut stdout) {
        Ok(halt_value) => {
            println!("{halt_value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "run failed");
            ExitCode::FAILURE
        }
    }
}
