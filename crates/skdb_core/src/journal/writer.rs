//! The journal: appends changes and tracks them in the change-tree.

use crate::change_tree::{ChangedVariable, VariableTree};
use crate::config::JournalConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::record::{decode_record, encode_record, DecodedRecord};
use crate::journal::recovery::{replay, RecoveryReport, VariableSink};
use crate::stats::JournalStats;
use skdb_codec::{DatabaseSerializer, VariablePath};
use skdb_storage::{JournalBuffer, MappedBuffer, StorageError};
use std::path::Path;
use tracing::{debug, info, warn};

/// A change journal over a [`JournalBuffer`].
///
/// Every change is appended to the buffer before the change-tree is
/// updated, so the tree never points at bytes that were not written.
///
/// The journal has a single writer: all mutating operations take
/// `&mut self`.
pub struct Journal<B: JournalBuffer, S: DatabaseSerializer> {
    buffer: B,
    serializer: S,
    tree: VariableTree,
    /// Reused framing buffer.
    scratch: Vec<u8>,
    sync_every: u32,
    unflushed: u32,
    /// Physical records since the last reset.
    records: u64,
    writes: u64,
    deletions: u64,
    flushes: u64,
}

impl<B: JournalBuffer, S: DatabaseSerializer> Journal<B, S> {
    fn with_parts(buffer: B, serializer: S, tree: VariableTree, records: u64) -> Self {
        Self {
            buffer,
            serializer,
            tree,
            scratch: Vec::new(),
            sync_every: 0,
            unflushed: 0,
            records,
            writes: 0,
            deletions: 0,
            flushes: 0,
        }
    }

    /// Starts a journal on an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the buffer already holds
    /// data; use [`Journal::open`] to recover it instead.
    pub fn create(buffer: B, serializer: S) -> CoreResult<Self> {
        if buffer.position() != 0 || buffer.as_bytes().iter().any(|&b| b != 0) {
            return Err(CoreError::invalid_argument(
                "buffer already holds journal data",
            ));
        }
        Ok(Self::with_parts(buffer, serializer, VariableTree::new(), 0))
    }

    /// Opens a journal, replaying any records already in the buffer.
    ///
    /// Every replayed record is passed to `sink`. A torn final record is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptRecord`] if the journal is corrupt before
    /// its last record.
    pub fn open<K>(mut buffer: B, serializer: S, sink: &mut K) -> CoreResult<(Self, RecoveryReport)>
    where
        K: VariableSink<S::Value> + ?Sized,
    {
        let mut tree = VariableTree::new();
        let report = replay(&mut buffer, &serializer, &mut tree, sink)?;
        let journal = Self::with_parts(buffer, serializer, tree, report.records);
        Ok((journal, report))
    }

    /// Sets the flush cadence; see [`JournalConfig::sync_every`].
    #[must_use]
    pub fn with_sync_every(mut self, records: u32) -> Self {
        self.sync_every = records;
        self
    }

    /// Records that `path` now holds `value`, or was deleted for `None`.
    ///
    /// Returns the location of the new record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CapacityExceeded`] if the record does not fit;
    /// the journal is unchanged in that case, as it is for serializer and
    /// append errors.
    ///
    /// Returns [`CoreError::FlushFailed`] if the record was written and
    /// indexed but the `sync_every` flush after it failed. The change is
    /// pending and [`CoreError::committed`] returns its location; the next
    /// flush retries.
    pub fn variable_changed(
        &mut self,
        path: &VariablePath,
        value: Option<&S::Value>,
    ) -> CoreResult<ChangedVariable> {
        let length = encode_record(&self.serializer, path, value, &mut self.scratch)?;
        let position = self.buffer.append(&self.scratch).map_err(|e| {
            let err = CoreError::from(e);
            if err.is_capacity_exceeded() {
                debug!(%path, length, remaining = self.buffer.remaining(), "journal full");
            }
            err
        })?;

        // length <= u32::MAX, enforced by encode_record
        let change = ChangedVariable::new(position, length as u32);
        self.tree.insert(path, change);
        self.records += 1;
        self.writes += 1;
        if value.is_none() {
            self.deletions += 1;
        }

        if self.sync_every > 0 {
            self.unflushed += 1;
            if self.unflushed >= self.sync_every {
                if let Err(err) = self.sync() {
                    warn!(%path, position, error = %err, "journal flush failed after write");
                    return Err(CoreError::FlushFailed { change, source: err });
                }
            }
        }
        Ok(change)
    }

    /// Records a new value for `path`.
    ///
    /// # Errors
    ///
    /// See [`Journal::variable_changed`].
    pub fn record_change(
        &mut self,
        path: &VariablePath,
        value: &S::Value,
    ) -> CoreResult<ChangedVariable> {
        self.variable_changed(path, Some(value))
    }

    /// Records that `path` was deleted.
    ///
    /// # Errors
    ///
    /// See [`Journal::variable_changed`].
    pub fn record_deletion(&mut self, path: &VariablePath) -> CoreResult<ChangedVariable> {
        self.variable_changed(path, None)
    }

    /// Forces written records to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot be flushed.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.sync()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.buffer.flush()?;
        self.unflushed = 0;
        self.flushes += 1;
        Ok(())
    }

    /// Every pending change, in path order.
    #[must_use]
    pub fn changes(&self) -> Vec<(VariablePath, ChangedVariable)> {
        self.tree.entries()
    }

    /// Visits every pending change in path order.
    ///
    /// The callback returns `Ok(true)` to continue or `Ok(false)` to stop.
    ///
    /// # Errors
    ///
    /// Propagates the first callback error.
    pub fn for_each_change<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnMut(&VariablePath, ChangedVariable) -> CoreResult<bool>,
    {
        self.tree.for_each(f)?;
        Ok(())
    }

    /// The pending change for exactly `path`.
    #[must_use]
    pub fn get(&self, path: &VariablePath) -> Option<ChangedVariable> {
        self.tree.get(path)
    }

    /// Raw bytes of the record at `change`, framing included.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the range lies beyond the
    /// written part of the journal.
    pub fn record_bytes(&self, change: &ChangedVariable) -> CoreResult<&[u8]> {
        if change.end() > self.buffer.position() {
            return Err(CoreError::invalid_argument(format!(
                "record {}..{} lies beyond the journal cursor {}",
                change.position,
                change.end(),
                self.buffer.position()
            )));
        }
        Ok(self.buffer.read_at(change.position, change.length as usize)?)
    }

    /// Decodes the record at `change`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptRecord`] if the bytes are not a valid
    /// record.
    pub fn read_change(&self, change: &ChangedVariable) -> CoreResult<DecodedRecord<S::Value>> {
        let bytes = self.record_bytes(change)?;
        decode_record(&self.serializer, bytes, change.position)
    }

    /// Discards everything: clears the tree, zero-fills the written part
    /// of the buffer, rewinds the cursor and flushes.
    ///
    /// Called once the pending changes have been folded into the database
    /// file.
    ///
    /// # Errors
    ///
    /// Propagates buffer errors.
    pub fn reset(&mut self) -> CoreResult<()> {
        let used = self.buffer.position();
        self.buffer.zero(0, used)?;
        self.buffer.seek(0)?;
        self.tree.clear();
        self.records = 0;
        self.flush()?;
        info!(discarded_bytes = used, "journal reset");
        Ok(())
    }

    /// A snapshot of journal usage.
    #[must_use]
    pub fn stats(&self) -> JournalStats {
        let entries = self.tree.entries();
        let live_bytes: u64 = entries.iter().map(|(_, c)| u64::from(c.length)).sum();
        let used_bytes = self.buffer.position();
        JournalStats {
            records: self.records,
            live_records: entries.len() as u64,
            used_bytes,
            live_bytes,
            dead_bytes: used_bytes.saturating_sub(live_bytes),
            capacity: self.buffer.capacity(),
            writes: self.writes,
            deletions: self.deletions,
            flushes: self.flushes,
        }
    }

    /// Whether the used bytes exceed `threshold` of the capacity.
    #[must_use]
    pub fn needs_compaction(&self, threshold: f64) -> bool {
        self.buffer.position() as f64 > threshold * self.buffer.capacity() as f64
    }

    /// Current write cursor.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.buffer.position()
    }

    /// Journal capacity.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.buffer.capacity()
    }

    /// The change-tree.
    #[must_use]
    pub fn tree(&self) -> &VariableTree {
        &self.tree
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// The serializer.
    #[must_use]
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Flushes and releases the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn close(mut self) -> CoreResult<()> {
        self.flush()
    }

    /// Consumes the journal, returning its buffer without flushing.
    #[must_use]
    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

impl<S: DatabaseSerializer> Journal<MappedBuffer, S> {
    /// Opens (or creates) a journal file and recovers it.
    ///
    /// # Errors
    ///
    /// Returns [`skdb_storage::StorageError::Locked`] (wrapped) if another
    /// process holds the file, or any recovery error.
    pub fn open_file<K>(
        path: impl AsRef<Path>,
        config: &JournalConfig,
        serializer: S,
        sink: &mut K,
    ) -> CoreResult<(Self, RecoveryReport)>
    where
        K: VariableSink<S::Value> + ?Sized,
    {
        let path = path.as_ref();
        let buffer = if config.create_dirs {
            MappedBuffer::open_with_create_dirs(path, config.capacity)?
        } else {
            MappedBuffer::open(path, config.capacity)?
        };
        info!(path = %path.display(), capacity = buffer.capacity(), "opening journal");

        let (journal, report) = Self::open(buffer, serializer, sink)?;
        Ok((journal.with_sync_every(config.sync_every), report))
    }
}

impl<B: JournalBuffer, S: DatabaseSerializer> std::fmt::Debug for Journal<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("position", &self.buffer.position())
            .field("capacity", &self.buffer.capacity())
            .field("pending", &self.tree.len())
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::recovery::NoopSink;
    use crate::journal::record::FRAME_OVERHEAD;
    use skdb_codec::{CborSerializer, Value};
    use skdb_storage::InMemoryBuffer;
    use std::collections::BTreeMap;

    fn journal(capacity: usize) -> Journal<InMemoryBuffer, CborSerializer> {
        Journal::create(InMemoryBuffer::new(capacity), CborSerializer::new()).unwrap()
    }

    fn path(text: &str) -> VariablePath {
        VariablePath::parse(text)
    }

    #[test]
    fn scenario_two_paths_three_writes() {
        let mut journal = journal(4096);
        let r1 = journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        let r2 = journal.record_change(&path("x"), &Value::Integer(2)).unwrap();
        let r3 = journal.record_change(&path("y"), &Value::Integer(3)).unwrap();

        assert_eq!(r1.position, 0);
        assert_eq!(r2.position, r1.end());
        assert_eq!(r3.position, r2.end());
        assert_eq!(journal.changes(), vec![(path("x"), r2), (path("y"), r3)]);

        journal.reset().unwrap();
        assert!(journal.changes().is_empty());
        let next = journal.record_change(&path("z"), &Value::Integer(4)).unwrap();
        assert_eq!(next.position, 0);
    }

    #[test]
    fn record_length_includes_framing() {
        let mut journal = journal(4096);
        let change = journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        // [0x81, 0x61, 'x'] + [0x01]
        assert_eq!(change.length as usize, FRAME_OVERHEAD + 4);
        assert_eq!(journal.position(), change.end());
    }

    #[test]
    fn read_change_resolves_value() {
        let mut journal = journal(4096);
        let change = journal
            .record_change(&path("a::b"), &Value::Text("v".into()))
            .unwrap();
        let record = journal.read_change(&change).unwrap();
        assert_eq!(record.path, path("a::b"));
        assert_eq!(record.value, Some(Value::Text("v".into())));

        let deleted = journal.record_deletion(&path("a::b")).unwrap();
        assert_eq!(journal.read_change(&deleted).unwrap().value, None);
        assert_eq!(journal.get(&path("a::b")), Some(deleted));
    }

    #[test]
    fn record_bytes_rejects_unwritten_range() {
        let journal = journal(4096);
        let result = journal.record_bytes(&ChangedVariable::new(0, 10));
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn capacity_boundary() {
        let probe = {
            let mut j = journal(4096);
            j.record_change(&path("x"), &Value::Integer(1)).unwrap().length as usize
        };

        // room for exactly one record
        let mut exact = journal(probe);
        exact.record_change(&path("x"), &Value::Integer(1)).unwrap();
        assert_eq!(exact.position(), probe as u64);

        // one byte short
        let mut short = journal(probe - 1);
        let err = short
            .record_change(&path("x"), &Value::Integer(1))
            .unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(short.position(), 0);
        assert!(short.tree().is_empty());
    }

    #[test]
    fn full_journal_keeps_tree_and_cursor() {
        let mut journal = journal(40);
        let first = journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        let before = journal.position();

        let big = Value::Bytes(vec![7; 64]);
        let err = journal.record_change(&path("x"), &big).unwrap_err();
        assert!(matches!(err, CoreError::CapacityExceeded { .. }));
        assert_eq!(journal.position(), before);
        assert_eq!(journal.get(&path("x")), Some(first));
    }

    #[test]
    fn create_rejects_used_buffer() {
        let mut buffer = InMemoryBuffer::new(64);
        buffer.append(&[1, 2, 3]).unwrap();
        let result = Journal::create(buffer, CborSerializer::new());
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn open_recovers_tree_and_values() {
        let mut journal = journal(4096);
        journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        journal.record_change(&path("a::b"), &Value::Integer(2)).unwrap();
        journal.record_deletion(&path("x")).unwrap();
        let expected = journal.changes();
        let end = journal.position();

        let data = journal.into_buffer().data();
        let mut values: BTreeMap<VariablePath, Value> = BTreeMap::new();
        let (reopened, report) = Journal::open(
            InMemoryBuffer::with_data(data),
            CborSerializer::new(),
            &mut values,
        )
        .unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(reopened.changes(), expected);
        assert_eq!(reopened.position(), end);
        assert_eq!(values.len(), 1);
        assert_eq!(values[&path("a::b")], Value::Integer(2));
    }

    #[test]
    fn stats_track_dead_bytes() {
        let mut journal = journal(4096);
        let first = journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        let second = journal.record_change(&path("x"), &Value::Integer(2)).unwrap();
        journal.record_deletion(&path("y")).unwrap();

        let stats = journal.stats();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.live_records, 2);
        assert_eq!(stats.dead_bytes, u64::from(first.length));
        assert_eq!(stats.used_bytes, journal.position());
        assert_eq!(stats.capacity, 4096);
        assert_eq!(stats.writes, 3);
        assert_eq!(stats.deletions, 1);
        assert!(stats.live_bytes >= u64::from(second.length));

        journal.reset().unwrap();
        let stats = journal.stats();
        assert_eq!(stats.records, 0);
        assert_eq!(stats.used_bytes, 0);
        assert_eq!(stats.writes, 3);
    }

    #[test]
    fn needs_compaction_threshold() {
        let mut journal = journal(100);
        assert!(!journal.needs_compaction(0.5));
        while journal.position() <= 50 {
            journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        }
        assert!(journal.needs_compaction(0.5));
        assert!(!journal.needs_compaction(1.0));
    }

    #[test]
    fn sync_every_counts_flushes() {
        let mut journal = journal(4096).with_sync_every(2);
        for i in 0..5 {
            journal.record_change(&path("x"), &Value::Integer(i)).unwrap();
        }
        assert_eq!(journal.stats().flushes, 2);
        journal.flush().unwrap();
        assert_eq!(journal.stats().flushes, 3);
    }

    /// An in-memory buffer whose flushes fail while `failing` is set.
    struct FlakyFlush {
        inner: InMemoryBuffer,
        failing: bool,
    }

    impl JournalBuffer for FlakyFlush {
        fn capacity(&self) -> u64 {
            self.inner.capacity()
        }
        fn position(&self) -> u64 {
            self.inner.position()
        }
        fn append(&mut self, data: &[u8]) -> skdb_storage::StorageResult<u64> {
            self.inner.append(data)
        }
        fn read_at(&self, offset: u64, len: usize) -> skdb_storage::StorageResult<&[u8]> {
            self.inner.read_at(offset, len)
        }
        fn as_bytes(&self) -> &[u8] {
            self.inner.as_bytes()
        }
        fn seek(&mut self, position: u64) -> skdb_storage::StorageResult<()> {
            self.inner.seek(position)
        }
        fn zero(&mut self, start: u64, end: u64) -> skdb_storage::StorageResult<()> {
            self.inner.zero(start, end)
        }
        fn flush(&mut self) -> skdb_storage::StorageResult<()> {
            if self.failing {
                return Err(StorageError::Io(std::io::Error::other("device lost")));
            }
            self.inner.flush()
        }
    }

    #[test]
    fn failed_flush_after_write_reports_the_committed_change() {
        let buffer = FlakyFlush {
            inner: InMemoryBuffer::new(4096),
            failing: true,
        };
        let mut journal = Journal::create(buffer, CborSerializer::new())
            .unwrap()
            .with_sync_every(1);

        let err = journal
            .record_change(&path("x"), &Value::Integer(7))
            .unwrap_err();
        let change = match &err {
            CoreError::FlushFailed { change, .. } => *change,
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(err.committed(), Some(change));
        assert_eq!(journal.get(&path("x")), Some(change));
        assert_eq!(journal.position(), change.end());
        assert_eq!(journal.stats().flushes, 0);
        assert_eq!(journal.stats().writes, 1);

        // the record is in the bytes and replays on reopen
        let data = journal.buffer().as_bytes().to_vec();
        let mut values = BTreeMap::<VariablePath, Value>::new();
        let (_, report) = Journal::open(
            InMemoryBuffer::with_data(data),
            CborSerializer::new(),
            &mut values,
        )
        .unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(values[&path("x")], Value::Integer(7));

        // a later flush retries
        journal.buffer.failing = false;
        journal.flush().unwrap();
        assert_eq!(journal.stats().flushes, 1);
    }

    #[test]
    fn append_failures_commit_nothing() {
        let mut journal = journal(16);
        let err = journal
            .record_change(&path("x"), &Value::Text("a long value".into()))
            .unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(err.committed(), None);
        assert!(journal.changes().is_empty());
    }

    #[test]
    fn for_each_change_stops_early() {
        let mut journal = journal(4096);
        for name in ["a", "b", "c"] {
            journal.record_change(&path(name), &Value::Null).unwrap();
        }

        let mut visited = Vec::new();
        journal
            .for_each_change(|path, _| {
                visited.push(path.to_string());
                Ok(visited.len() < 2)
            })
            .unwrap();
        assert_eq!(visited, ["a", "b"]);
    }

    #[test]
    fn reset_zeroes_written_bytes() {
        let mut journal = journal(256);
        journal.record_change(&path("x"), &Value::Integer(1)).unwrap();
        journal.reset().unwrap();
        assert!(journal.buffer().as_bytes().iter().all(|&b| b == 0));

        let data = journal.into_buffer().data();
        let (reopened, report) =
            Journal::open(InMemoryBuffer::with_data(data), CborSerializer::new(), &mut NoopSink)
                .unwrap();
        assert_eq!(report.records, 0);
        assert!(reopened.changes().is_empty());
    }
}
