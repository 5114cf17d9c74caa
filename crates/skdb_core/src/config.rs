//! Journal configuration.

/// Default journal capacity: 4 MiB.
pub const DEFAULT_CAPACITY: u64 = 4 * 1024 * 1024;

/// Configuration for opening a journal file.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Size of the journal file in bytes.
    pub capacity: u64,

    /// Flush the mapping after this many records (0 = leave it to the OS).
    pub sync_every: u32,

    /// Whether to create missing parent directories.
    pub create_dirs: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            sync_every: 0,
            create_dirs: true,
        }
    }
}

impl JournalConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the journal capacity.
    #[must_use]
    pub const fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the flush cadence.
    #[must_use]
    pub const fn sync_every(mut self, records: u32) -> Self {
        self.sync_every = records;
        self
    }

    /// Sets whether to create missing parent directories.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}
