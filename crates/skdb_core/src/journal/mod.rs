//! The change journal: durable change records and crash recovery.
//!
//! Every variable change is appended to a fixed-capacity journal buffer as
//! one self-contained record, then indexed in the change-tree. On restart
//! the records are replayed from offset 0 to rebuild the tree.
//!
//! ## Record Format
//!
//! ```text
//! | marker 0xA7 (1) | payload length u32 LE (4) | payload (N) | crc32c (4) |
//! payload = path ++ value-or-deletion-marker
//! ```
//!
//! The checksum covers marker, length and payload. Unwritten bytes are
//! zero, so a `0x00` where a marker is expected ends the journal.
//!
//! ## Recovery Policy
//!
//! A record that fails to frame, checksum or decode is judged by what
//! follows it:
//!
//! ### Tolerated (torn tail)
//!
//! Only zero bytes after the range the record claims. The process died
//! while writing the last record. The record is dropped, its bytes are
//! zero-filled so later appends start on a clean region, and recovery
//! succeeds with the records before it.
//!
//! ### Fatal (corrupt journal)
//!
//! Written bytes after the bad record. Records were damaged after they
//! were written, and the journal MUST NOT open: replaying past the damage
//! would silently lose changes. Returns [`crate::CoreError::CorruptRecord`].
//!
//! The same holds for an end marker followed by written bytes: a record
//! whose marker byte was lost looks like the end of the journal.
//!
//! ## Invariants
//!
//! - Records are appended in one buffer write, before the tree changes
//! - After recovery the cursor sits at the end of the last valid record
//! - Replay is idempotent: replaying the same bytes yields the same tree

mod iterator;
mod record;
mod recovery;
mod writer;

pub use iterator::{RecordIterator, TornTail};
pub use record::{
    decode_record, encode_record, DecodedRecord, CRC_SIZE, END_MARKER, FRAME_OVERHEAD,
    HEADER_SIZE, MAX_PAYLOAD_SIZE, RECORD_MARKER,
};
pub use recovery::{replay, FnSink, NoopSink, RecoveryReport, VariableSink};
pub use writer::Journal;
