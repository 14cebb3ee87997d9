//! `myconfig` command-line entry point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use myconfig_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command = args.command.name();
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        log.debug(&format!("cannot install Ctrl-C handler: {e}"));
    }

    match args.command {
        cli::Command::Export(opts) => commands::export::run(&args.global, &opts, &log, cancel),
        cli::Command::Restore(opts) => commands::restore::run(&args.global, &opts, &log, cancel),
        cli::Command::Scan => commands::scan::run(&args.global, &log, cancel),
        cli::Command::Verify(opts) => commands::verify::run(&opts, &log),
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
