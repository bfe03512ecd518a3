#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod telemetry;

use std::process;

use clap::Parser;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "sluice_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "sluice_cli::shutdown";
pub const TRACING_TARGET_COMMAND: &str = "sluice_cli::command";

fn main() {
    let Err(error) = run() else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "command completed successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(&cli.log)?;
    log_startup_info(&cli.command);

    match &cli.command {
        Command::Run(args) => command::run(args),
        Command::Validate(args) => command::validate(args),
        Command::Graph(args) => command::graph(args),
    }
}

/// Logs startup information.
fn log_startup_info(command: &Command) {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        command = command.name(),
        definition = %command.definition().display(),
        "starting sluice"
    );

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        "build information"
    );
}
