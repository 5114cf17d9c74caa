//! Journal buffer trait definition.

use crate::error::StorageResult;

/// A fixed-capacity, append-oriented byte region.
///
/// Journal buffers are **opaque byte regions** with a write cursor. The
/// journal decides what the bytes mean; buffers only guarantee placement
/// and bounds.
///
/// # Invariants
///
/// - `append` returns the offset where the data starts
/// - `append` never writes past `capacity()`; a rejected append leaves the
///   cursor and the region untouched
/// - `read_at` returns exactly the bytes stored at that offset
/// - bytes that were never written, or were zeroed, read back as `0`
///
/// # Implementors
///
/// - [`super::MappedBuffer`] - For persistent journals
/// - [`super::InMemoryBuffer`] - For testing
pub trait JournalBuffer: Send {
    /// Total size of the region in bytes.
    fn capacity(&self) -> u64;

    /// Current write cursor. This is where the next `append` will write.
    fn position(&self) -> u64;

    /// Bytes left between the cursor and the end of the region.
    fn remaining(&self) -> u64 {
        self.capacity().saturating_sub(self.position())
    }

    /// Appends data at the cursor and advances it.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::CapacityExceeded`] if the data does not
    /// fit in the remaining capacity.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Returns `len` bytes starting at `offset`.
    ///
    /// Reads are bounded by the capacity, not by the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends
    /// beyond the region.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<&[u8]>;

    /// Returns the whole region.
    fn as_bytes(&self) -> &[u8];

    /// Moves the write cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidPosition`] past the capacity.
    fn seek(&mut self, position: u64) -> StorageResult<()>;

    /// Zero-fills `start..end`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidPosition`] if the range is
    /// reversed or extends beyond the region.
    fn zero(&mut self, start: u64, end: u64) -> StorageResult<()>;

    /// Forces all written bytes to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;
}

/// Validates a `start..end` range against a capacity.
pub(crate) fn check_range(start: u64, end: u64, capacity: u64) -> StorageResult<()> {
    if start > end {
        return Err(crate::StorageError::InvalidPosition {
            position: start,
            capacity,
        });
    }
    if end > capacity {
        return Err(crate::StorageError::InvalidPosition {
            position: end,
            capacity,
        });
    }
    Ok(())
}
