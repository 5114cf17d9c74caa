//! Error types for SkDb core.

use crate::change_tree::ChangedVariable;
use skdb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in journal operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Journal buffer error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Serializer error.
    #[error("codec error: {0}")]
    Codec(#[from] skdb_codec::CodecError),

    /// A record was written and indexed, but the flush after it failed.
    ///
    /// The change is pending in the journal and will be replayed on the
    /// next open if the bytes reach storage; it was not rejected.
    #[error("record at offset {} written but not flushed: {source}", change.position)]
    FlushFailed {
        /// The committed record.
        change: ChangedVariable,
        /// Why the flush failed.
        #[source]
        source: StorageError,
    },

    /// The journal has no room for the record.
    ///
    /// The journal must be compacted before further writes succeed.
    #[error("journal capacity exceeded: record needs {requested} bytes, {available} available")]
    CapacityExceeded {
        /// Framed size of the rejected record.
        requested: u64,
        /// Bytes left in the journal.
        available: u64,
    },

    /// A record in the middle of the journal cannot be read.
    #[error("corrupt journal record at offset {offset}: {reason}")]
    CorruptRecord {
        /// Offset of the unreadable record.
        offset: u64,
        /// What is wrong with it.
        reason: String,
    },

    /// An argument was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a corrupt record error.
    pub fn corrupt_record(offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// The record this error leaves committed, if any.
    ///
    /// Only [`CoreError::FlushFailed`] reports a write that took place.
    #[must_use]
    pub fn committed(&self) -> Option<ChangedVariable> {
        match self {
            Self::FlushFailed { change, .. } => Some(*change),
            _ => None,
        }
    }

    /// Whether this error means the journal is full.
    #[must_use]
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::CapacityExceeded {
                requested,
                available,
            } => Self::CapacityExceeded {
                requested,
                available,
            },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_lifted_out_of_storage() {
        let err = CoreError::from(StorageError::CapacityExceeded {
            requested: 10,
            available: 3,
        });
        assert!(err.is_capacity_exceeded());
        assert_eq!(
            err.to_string(),
            "journal capacity exceeded: record needs 10 bytes, 3 available"
        );
    }

    #[test]
    fn other_storage_errors_stay_wrapped() {
        let err = CoreError::from(StorageError::Corrupted("bad".into()));
        assert!(matches!(err, CoreError::Storage(StorageError::Corrupted(_))));
        assert_eq!(err.committed(), None);
    }

    #[test]
    fn flush_failure_reports_the_committed_record() {
        let change = ChangedVariable::new(24, 12);
        let err = CoreError::FlushFailed {
            change,
            source: StorageError::Corrupted("disk gone".into()),
        };
        assert_eq!(err.committed(), Some(change));
        assert!(!err.is_capacity_exceeded());
        assert_eq!(
            err.to_string(),
            "record at offset 24 written but not flushed: storage corrupted: disk gone"
        );
    }
}
