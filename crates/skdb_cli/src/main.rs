//! SkDb CLI
//!
//! Maintenance tools for SkDb change journals.
//!
//! # Commands
//!
//! - `inspect` - Display journal usage and recovery status
//! - `verify` - Check every record; fails on a journal that would not open
//! - `dump` - Print pending changes, or every record with `--all`
//!
//! Commands read the journal without modifying it.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::Format;
use error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// SkDb command-line journal tools.
#[derive(Parser)]
#[command(name = "skdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display journal usage and recovery status
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Verify journal integrity
    Verify,

    /// Dump journal records for debugging
    Dump {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Dump every record, superseded ones included, in journal order
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or(CliError::MissingPath { command: "inspect" })?;
            commands::inspect::run(&path, format)
        }
        Commands::Verify => {
            let path = cli.path.ok_or(CliError::MissingPath { command: "verify" })?;
            commands::verify::run(&path)
        }
        Commands::Dump { limit, all, format } => {
            let path = cli.path.ok_or(CliError::MissingPath { command: "dump" })?;
            commands::dump::run(&path, limit, all, format)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
