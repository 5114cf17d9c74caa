//! Memory-mapped journal buffer for persistent journals.

use crate::buffer::{check_range, JournalBuffer};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A journal buffer backed by a memory-mapped file.
///
/// Every append is a plain memory store into the shared mapping, so the
/// bytes reach the OS page cache immediately and survive a process crash.
/// Surviving power loss requires [`JournalBuffer::flush`], which calls
/// `msync` on the mapping.
///
/// # Ownership
///
/// The buffer owns the file handle, its exclusive lock and the mapping.
/// Dropping the buffer unmaps the region and closes the file, which also
/// releases the lock.
///
/// # Example
///
/// ```no_run
/// use skdb_storage::{JournalBuffer, MappedBuffer};
/// use std::path::Path;
///
/// let mut buffer = MappedBuffer::open(Path::new("journal.skj"), 4096).unwrap();
/// buffer.append(b"persistent data").unwrap();
/// buffer.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct MappedBuffer {
    path: PathBuf,
    mmap: MmapMut,
    position: u64,
    // Held for the lock; closed after the mapping is dropped.
    _file: File,
}

impl MappedBuffer {
    /// Opens or creates a journal file and maps `capacity` bytes of it.
    ///
    /// A shorter file is extended with zeros to `capacity`. A longer file is
    /// mapped at its own length so that no records are cut off. The cursor
    /// starts at 0; recovery places it after the last record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, sized, locked or
    /// mapped, or if the capacity is zero.
    pub fn open(path: &Path, capacity: u64) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "journal capacity must be greater than zero",
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        file.try_lock_exclusive().map_err(|_| StorageError::Locked {
            path: path.to_path_buf(),
        })?;

        let existing = file.metadata()?.len();
        let len = if existing < capacity {
            file.set_len(capacity)?;
            capacity
        } else {
            if existing > capacity {
                warn!(
                    path = %path.display(),
                    existing,
                    capacity,
                    "journal file is larger than configured capacity, mapping whole file"
                );
            }
            existing
        };

        let map_len = usize::try_from(len).map_err(|_| {
            StorageError::Corrupted(format!("journal length {len} exceeds address space"))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            mmap: map_file(&file, map_len)?,
            position: 0,
            _file: file,
        })
    }

    /// Opens a journal file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path, capacity: u64) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path, capacity)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[allow(unsafe_code)]
fn map_file(file: &File, len: usize) -> StorageResult<MmapMut> {
    // SAFETY: the file is locked exclusively for the lifetime of the
    // mapping, so no other cooperating process resizes or rewrites it.
    let mmap = unsafe { MmapOptions::new().len(len).map_mut(file)? };
    Ok(mmap)
}

impl JournalBuffer for MappedBuffer {
    fn capacity(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.position;
        let requested = data.len() as u64;
        let available = self.remaining();
        if requested > available {
            return Err(StorageError::CapacityExceeded {
                requested,
                available,
            });
        }

        let start = offset as usize;
        self.mmap[start..start + data.len()].copy_from_slice(data);
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
        Ok(&self.mmap[offset as usize..end as usize])
    }

    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    fn seek(&mut self, position: u64) -> StorageResult<()> {
        check_range(0, position, self.capacity())?;
        self.position = position;
        Ok(())
    }

    fn zero(&mut self, start: u64, end: u64) -> StorageResult<()> {
        check_range(start, end, self.capacity())?;
        self.mmap[start as usize..end as usize].fill(0);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.mmap.flush()?;
        debug!(path = %self.path.display(), position = self.position, "journal flushed");
        Ok(())
    }
}
