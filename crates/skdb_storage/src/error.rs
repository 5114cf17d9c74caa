//! Error types for journal buffer operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The append does not fit in the remaining capacity.
    #[error("capacity exceeded: requested {requested} bytes, {available} available")]
    CapacityExceeded {
        /// Number of bytes the caller tried to append.
        requested: u64,
        /// Number of bytes left before the end of the region.
        available: u64,
    },

    /// Attempted to read beyond the end of the region.
    #[error("read beyond end of buffer: offset {offset}, len {len}, capacity {capacity}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The buffer capacity.
        capacity: u64,
    },

    /// A cursor or range position lies outside the region.
    #[error("invalid position {position} for buffer of capacity {capacity}")]
    InvalidPosition {
        /// The offending position.
        position: u64,
        /// The buffer capacity.
        capacity: u64,
    },

    /// Another process holds the journal file.
    #[error("journal file is locked by another process: {}", path.display())]
    Locked {
        /// Path of the locked file.
        path: PathBuf,
    },

    /// The journal file cannot be used as a buffer.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}
