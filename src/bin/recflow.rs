//! recflow: run a chain of verbs over streams of keyed text records.
//!
//! Usage:
//!   recflow [options] verb [verb options] then verb [verb options] ... [files]
//!
//! With no files, reads standard input. Output goes to standard output,
//! diagnostics to standard error.

use std::io;
use std::process;

use clap::Parser;
use recflow::PipelineError;
use recflow::cli::{self, Cli};
use tracing::Level;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };
    init_tracing(cli.verbose);

    match cli::run(cli) {
        Ok(()) | Err(PipelineError::HelpRequested) => {}
        // Downstream of a shell pipe closed early, e.g. `recflow cat | head`.
        Err(PipelineError::Write(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => {
            eprintln!("recflow: {e}");
            process::exit(1);
        }
    }
}
