//! CLI error type.

use skdb_core::CoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the `skdb` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No `--path` was given.
    #[error("journal path required for {command} (use -p <file>)")]
    MissingPath {
        /// The command that needs it.
        command: &'static str,
    },

    /// The journal file does not exist.
    #[error("no journal found at {}", .0.display())]
    NotFound(PathBuf),

    /// The journal could not be read or recovered.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON output failed.
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Verification found a journal that would not open.
    #[error("journal verification failed: {0}")]
    VerificationFailed(String),
}
