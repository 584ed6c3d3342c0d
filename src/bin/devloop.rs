// src/bin/devloop.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use devloop::{
    CancellationToken,
    cli::{Cli, Commands, handlers},
    system::executor,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The main entry point of the `devloop` application.
/// Sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    // The CancellationToken is a simple flag checked by the executor's
    // polling loop while variable commands and plugins run.
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        // --- Centralized Error Handling ---
        // An interruption (e.g. Ctrl+C during a variable command) exits
        // silently with the standard shell exit code.
        let interrupted = e.chain().any(|cause| {
            cause
                .downcast_ref::<executor::ExecutionError>()
                .is_some_and(|err| matches!(err, executor::ExecutionError::Interrupted))
        });
        if interrupted {
            std::process::exit(130);
        }

        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    match cli.command {
        Commands::Print => handlers::print::handle(&cli.global, cancellation_token),
        Commands::Vars => handlers::vars::handle(&cli.global, cancellation_token),
    }
}
