//! cfsync CLI - publish documentation trees to Confluence.
//!
//! Provides commands for:
//! - `sync`: Create or update every page of the navigation tree
//! - `plan`: Show the writes a sync would perform

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PlanArgs, SyncArgs};
use output::Output;

/// cfsync - Publish documentation trees to Confluence.
#[derive(Parser)]
#[command(name = "cfsync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update pages and attachments.
    Sync(SyncArgs),
    /// Print the reconciliation plan without writing.
    Plan(PlanArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    let result = match cli.command {
        Commands::Sync(args) => args.execute(),
        Commands::Plan(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging once the effective verbosity is known.
///
/// `debug` enables DEBUG, `verbose` enables INFO, otherwise `RUST_LOG` or WARN.
pub(crate) fn init_tracing(debug: bool, verbose: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
