//! # SkDb Core
//!
//! The crash-resilient change journal of SkDb.
//!
//! A [`Journal`] accepts changes to path-addressed variables, persists each
//! change immediately into a journal buffer (normally a memory-mapped
//! file), and keeps a change-tree of the paths that changed since the last
//! compaction. The tree is rebuilt from the journal bytes alone when the
//! journal is reopened.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Journal (variable_changed, reset, ...) │
//! ├───────────────────┬─────────────────────┤
//! │  VariableTree     │  Record framing     │
//! │  (pending paths)  │  + recovery         │
//! ├───────────────────┴─────────────────────┤
//! │  DatabaseSerializer (skdb_codec)        │
//! ├─────────────────────────────────────────┤
//! │  JournalBuffer (skdb_storage)           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use skdb_codec::{CborSerializer, Value, VariablePath};
//! use skdb_core::{Journal, NoopSink};
//! use skdb_storage::InMemoryBuffer;
//!
//! let mut journal = Journal::create(InMemoryBuffer::new(4096), CborSerializer::new()).unwrap();
//! journal.record_change(&VariablePath::parse("x"), &Value::Integer(1)).unwrap();
//! journal.record_change(&VariablePath::parse("x"), &Value::Integer(2)).unwrap();
//! assert_eq!(journal.changes().len(), 1);
//!
//! // Reopen from the same bytes
//! let data = journal.into_buffer().data();
//! let (journal, report) = Journal::open(
//!     InMemoryBuffer::with_data(data),
//!     CborSerializer::new(),
//!     &mut NoopSink,
//! )
//! .unwrap();
//! assert_eq!(report.records, 2);
//! assert_eq!(journal.changes().len(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod change_tree;
mod config;
mod error;
pub mod journal;
mod stats;

pub use change_tree::{ChangedVariable, VariableTree};
pub use config::{JournalConfig, DEFAULT_CAPACITY};
pub use error::{CoreError, CoreResult};
pub use journal::{
    DecodedRecord, FnSink, Journal, NoopSink, RecordIterator, RecoveryReport, TornTail,
    VariableSink,
};
pub use stats::JournalStats;

// Re-export the types journal users need from the lower layers
pub use skdb_codec::{CborSerializer, DatabaseSerializer, Value, VariablePath};
pub use skdb_storage::{InMemoryBuffer, JournalBuffer, MappedBuffer};
