//! # SkDb Storage
//!
//! Fixed-capacity journal buffers for the SkDb change journal.
//!
//! A journal buffer is an **opaque, append-oriented byte region** with a
//! write cursor. It does not interpret the records it holds; the journal in
//! `skdb_core` owns the record format.
//!
//! ## Design Principles
//!
//! - Capacity is fixed when the buffer is opened
//! - Appends either fit completely or fail without moving the cursor
//! - Reads are offset-addressed over the whole region, never cursor-relative
//! - Bytes that were never written are zero
//!
//! ## Available Buffers
//!
//! - [`MappedBuffer`] - A file mapped read-write into memory
//! - [`InMemoryBuffer`] - For testing and ephemeral journals
//!
//! ## Example
//!
//! ```rust
//! use skdb_storage::{JournalBuffer, InMemoryBuffer};
//!
//! let mut buffer = InMemoryBuffer::new(64);
//! let offset = buffer.append(b"hello world").unwrap();
//! assert_eq!(buffer.read_at(offset, 11).unwrap(), b"hello world");
//! assert_eq!(buffer.remaining(), 53);
//! ```

#![warn(missing_docs)]

mod buffer;
mod error;
mod mapped;
mod memory;

pub use buffer::JournalBuffer;
pub use error::{StorageError, StorageResult};
pub use mapped::MappedBuffer;
pub use memory::InMemoryBuffer;
