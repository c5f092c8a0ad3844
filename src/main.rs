//! Binary entry point for rollcall.
//!
//! This binary provides the CLI interface for the attendance reconciler.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use rollcall::StopSignal;
use rollcall::cli::{
    ConfigCommand, ReplayCommand, ReportCommand, SaveCommand, ShowCommand, StatusCommand,
};
use rollcall::config::RollcallConfig;
use rollcall::observability::{self, InitOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Rollcall - reconciles face-match streams into attendance records.
#[derive(Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded match stream through the recognition loop.
    Replay(ReplayCommand),

    /// Save a session roster with explicit statuses.
    Save(SaveCommand),

    /// Show the records of one session.
    Show(ShowCommand),

    /// List records or summarise a student's attendance.
    Report(ReportCommand),

    /// Show ledger status.
    Status,

    /// Manage configuration.
    Config(ConfigCommand),
}

/// Main entry point.
fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match RollcallConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Replay(_));
    let _observability = match observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &RollcallConfig) -> rollcall::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match command {
        Commands::Replay(cmd) => {
            let stop = install_stop_handler();
            cmd.run(config, &stop, &mut out).map(|_| ())
        },
        Commands::Save(cmd) => cmd.run(config, &mut out).map(|_| ()),
        Commands::Show(cmd) => cmd.run(config, &mut out).map(|_| ()),
        Commands::Report(cmd) => cmd.run(config, &mut out),
        Commands::Status => StatusCommand::new().run(config, &mut out),
        Commands::Config(cmd) => cmd.run(config, &mut out),
    };

    let _ = out.flush();
    result
}

/// Sets the stop signal on Ctrl-C; the run ends after the current frame.
fn install_stop_handler() -> StopSignal {
    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.stop()) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }
    stop
}
