//! Rebuilding the change-tree from journal bytes.

use crate::change_tree::VariableTree;
use crate::error::CoreResult;
use crate::journal::iterator::RecordIterator;
use skdb_codec::{DatabaseSerializer, VariablePath};
use skdb_storage::JournalBuffer;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Receives every record replayed during recovery, oldest first.
///
/// The store uses this to restore the in-memory variables the journal
/// holds. A path may be replayed several times; the last call wins.
pub trait VariableSink<V> {
    /// Applies one replayed record. `None` means the variable was deleted.
    ///
    /// # Errors
    ///
    /// An error aborts recovery.
    fn replay(&mut self, path: &VariablePath, value: Option<V>) -> CoreResult<()>;
}

/// A sink that discards replayed values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl<V> VariableSink<V> for NoopSink {
    fn replay(&mut self, _path: &VariablePath, _value: Option<V>) -> CoreResult<()> {
        Ok(())
    }
}

/// Collects the latest value of every variable; deletions remove it.
impl<V> VariableSink<V> for BTreeMap<VariablePath, V> {
    fn replay(&mut self, path: &VariablePath, value: Option<V>) -> CoreResult<()> {
        match value {
            Some(value) => {
                self.insert(path.clone(), value);
            }
            None => {
                self.remove(path);
            }
        }
        Ok(())
    }
}

/// A sink backed by a closure.
pub struct FnSink<F>(pub F);

impl<V, F> VariableSink<V> for FnSink<F>
where
    F: FnMut(&VariablePath, Option<V>) -> CoreResult<()>,
{
    fn replay(&mut self, path: &VariablePath, value: Option<V>) -> CoreResult<()> {
        (self.0)(path, value)
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records replayed.
    pub records: u64,
    /// Bytes covered by the replayed records.
    pub bytes: u64,
    /// Offset of the torn record that was discarded, if any.
    pub torn_tail: Option<u64>,
    /// Distinct paths in the rebuilt tree.
    pub paths: usize,
}

/// Replays `buffer` from offset 0 into `tree` and `sink`.
///
/// On return the cursor sits at the end of the last valid record and any
/// torn tail has been zero-filled and flushed.
///
/// # Errors
///
/// Returns [`crate::CoreError::CorruptRecord`] if a bad record is followed
/// by more written bytes, or propagates sink and buffer errors.
pub fn replay<B, S, K>(
    buffer: &mut B,
    serializer: &S,
    tree: &mut VariableTree,
    sink: &mut K,
) -> CoreResult<RecoveryReport>
where
    B: JournalBuffer,
    S: DatabaseSerializer,
    K: VariableSink<S::Value> + ?Sized,
{
    tree.clear();
    let mut report = RecoveryReport::default();

    let mut records = RecordIterator::new(buffer.as_bytes(), serializer);
    for result in records.by_ref() {
        let (location, record) = result?;
        tree.insert(&record.path, location);
        sink.replay(&record.path, record.value)?;
        report.records += 1;
    }
    let end = records.position();
    let torn = records.torn_tail();

    if let Some(torn) = torn {
        warn!(
            offset = torn.offset,
            end = torn.end,
            "discarding torn journal tail"
        );
        buffer.zero(torn.offset, torn.end)?;
        buffer.flush()?;
        report.torn_tail = Some(torn.offset);
    }
    buffer.seek(end)?;

    report.bytes = end;
    report.paths = tree.len();
    info!(
        records = report.records,
        bytes = report.bytes,
        paths = report.paths,
        "journal recovered"
    );
    Ok(report)
}
