//! # chatarchive CLI
//!
//! Data goes to stdout, diagnostics to stderr.

use std::io;
use std::process;

use clap::Parser as ClapParser;
use tracing::info;

use chatarchive::cli::{Args, Command};
use chatarchive::core::{run_contacts, run_messages};
use chatarchive::{ArchiveError, create_adapter};

fn main() {
    let args = <Args as ClapParser>::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<(), ArchiveError> {
    let adapter = create_adapter(args.source.into(), args.source_options())?;
    info!(adapter = adapter.name(), command = %args.command, "starting");

    let stdout = io::stdout().lock();
    match args.command {
        Command::Contacts => run_contacts(adapter.as_ref(), stdout)?,
        Command::Messages => run_messages(adapter.as_ref(), stdout)?,
    };
    Ok(())
}
