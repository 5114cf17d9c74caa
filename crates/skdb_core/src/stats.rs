//! Journal statistics.
//!
//! A [`JournalStats`] snapshot tells an external compaction policy how
//! much of the journal is still needed.
//!
//! # Usage
//!
//! ```
//! use skdb_codec::{CborSerializer, Value, VariablePath};
//! use skdb_core::Journal;
//! use skdb_storage::InMemoryBuffer;
//!
//! let mut journal = Journal::create(InMemoryBuffer::new(4096), CborSerializer::new()).unwrap();
//! let path = VariablePath::parse("x");
//! journal.record_change(&path, &Value::Integer(1)).unwrap();
//! journal.record_change(&path, &Value::Integer(2)).unwrap();
//!
//! let stats = journal.stats();
//! assert_eq!(stats.records, 2);
//! assert_eq!(stats.live_records, 1);
//! assert_eq!(stats.dead_bytes + stats.live_bytes, stats.used_bytes);
//! ```

/// A point-in-time view of journal usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalStats {
    /// Physical records since the last reset, including replayed ones.
    pub records: u64,
    /// Records still referenced by the change-tree (one per pending path).
    pub live_records: u64,
    /// Bytes between offset 0 and the write cursor.
    pub used_bytes: u64,
    /// Bytes of the live records.
    pub live_bytes: u64,
    /// Bytes of superseded records.
    pub dead_bytes: u64,
    /// Journal capacity.
    pub capacity: u64,

    /// Changes written since the journal was opened.
    pub writes: u64,
    /// Of those, deletions.
    pub deletions: u64,
    /// Explicit and cadence flushes since the journal was opened.
    pub flushes: u64,
}

impl JournalStats {
    /// Fraction of the capacity in use, in `0.0..=1.0`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.capacity as f64
    }

    /// Fraction of the used bytes that are superseded.
    #[must_use]
    pub fn dead_ratio(&self) -> f64 {
        if self.used_bytes == 0 {
            return 0.0;
        }
        self.dead_bytes as f64 / self.used_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_of_empty_journal_are_zero() {
        let stats = JournalStats::default();
        assert_eq!(stats.utilization(), 0.0);
        assert_eq!(stats.dead_ratio(), 0.0);
    }

    #[test]
    fn ratios() {
        let stats = JournalStats {
            used_bytes: 50,
            live_bytes: 10,
            dead_bytes: 40,
            capacity: 100,
            ..JournalStats::default()
        };
        assert!((stats.utilization() - 0.5).abs() < f64::EPSILON);
        assert!((stats.dead_ratio() - 0.8).abs() < f64::EPSILON);
    }
}
