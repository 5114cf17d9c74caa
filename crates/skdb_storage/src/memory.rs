//! In-memory journal buffer for testing.

use crate::buffer::{check_range, JournalBuffer};
use crate::error::{StorageError, StorageResult};

/// A fixed-capacity journal buffer held in memory.
///
/// This buffer is suitable for:
/// - Unit tests
/// - Recovery tests, seeded with [`InMemoryBuffer::with_data`]
/// - Ephemeral journals that don't need persistence
///
/// # Example
///
/// ```rust
/// use skdb_storage::{JournalBuffer, InMemoryBuffer};
///
/// let mut buffer = InMemoryBuffer::new(16);
/// let offset = buffer.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(buffer.position(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBuffer {
    data: Vec<u8>,
    position: u64,
}

impl InMemoryBuffer {
    /// Creates a zero-filled buffer of the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            position: 0,
        }
    }

    /// Creates a buffer holding pre-existing bytes.
    ///
    /// The capacity is `data.len()` and the cursor starts at 0, the state a
    /// journal file is in right after being mapped.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Returns a copy of the whole region.
    ///
    /// Useful for simulating a crash: the bytes can be fed to a fresh
    /// buffer with [`InMemoryBuffer::with_data`].
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.clone()
    }
}

impl JournalBuffer for InMemoryBuffer {
    fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let offset = self.position;
        let requested = new_data.len() as u64;
        let available = self.remaining();
        if requested > available {
            return Err(StorageError::CapacityExceeded {
                requested,
                available,
            });
        }

        let start = offset as usize;
        self.data[start..start + new_data.len()].copy_from_slice(new_data);
        self.position += requested;
        Ok(offset)
    }

    fn read_at(&self, offset: u64, len: usize) -> StorageResult<&[u8]> {
        let capacity = self.capacity();
        let end = offset.saturating_add(len as u64);
        if end > capacity {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                capacity,
            });
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn seek(&mut self, position: u64) -> StorageResult<()> {
        check_range(0, position, self.capacity())?;
        self.position = position;
        Ok(())
    }

    fn zero(&mut self, start: u64, end: u64) -> StorageResult<()> {
        check_range(start, end, self.capacity())?;
        self.data[start as usize..end as usize].fill(0);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing to persist
        Ok(())
    }
}
