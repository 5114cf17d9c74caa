//! Streaming journal record iterator.
//!
//! Walks the records of a journal region one by one, without copying the
//! region or collecting the records.

use crate::change_tree::ChangedVariable;
use crate::error::{CoreError, CoreResult};
use crate::journal::record::{decode_payload, read_frame, DecodedRecord, Frame};
use skdb_codec::DatabaseSerializer;

/// A discarded final record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TornTail {
    /// Offset of the torn record.
    pub offset: u64,
    /// Exclusive end of the bytes to discard.
    pub end: u64,
}

/// An iterator over the records of a journal region.
///
/// Yields `(location, record)` for each valid record, starting at offset 0.
///
/// # Error Handling
///
/// - End marker with only zero bytes after it, or end of region:
///   iteration ends
/// - A bad record with only zero bytes after it: iteration ends and
///   [`RecordIterator::torn_tail`] reports it
/// - A bad record followed by written bytes: yields
///   [`CoreError::CorruptRecord`] once, then ends
///
/// An end marker followed by written bytes is corruption too: a record
/// whose marker byte was lost may still be followed by committed records.
///
/// # Example
///
/// ```
/// use skdb_codec::CborSerializer;
/// use skdb_core::journal::RecordIterator;
///
/// let region = [0u8; 64];
/// let serializer = CborSerializer::new();
/// let mut iter = RecordIterator::new(&region, &serializer);
/// assert!(iter.next().is_none());
/// assert_eq!(iter.position(), 0);
/// ```
pub struct RecordIterator<'a, S: DatabaseSerializer> {
    region: &'a [u8],
    serializer: &'a S,
    offset: usize,
    torn_tail: Option<TornTail>,
    finished: bool,
}

impl<'a, S: DatabaseSerializer> RecordIterator<'a, S> {
    /// Creates an iterator over `region`.
    pub fn new(region: &'a [u8], serializer: &'a S) -> Self {
        Self {
            region,
            serializer,
            offset: 0,
            torn_tail: None,
            finished: false,
        }
    }

    /// End of the last valid record read so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset as u64
    }

    /// The torn final record, once iteration has stopped on one.
    #[must_use]
    pub fn torn_tail(&self) -> Option<TornTail> {
        self.torn_tail
    }

    /// First nonzero byte at or after `start`.
    fn written_from(&self, start: usize) -> Option<usize> {
        self.region
            .get(start..)
            .and_then(|rest| rest.iter().position(|&b| b != 0))
            .map(|at| start + at)
    }

    /// Handles a bad record at the current offset.
    fn reject(
        &mut self,
        reason: String,
        claimed_end: usize,
    ) -> Option<CoreResult<(ChangedVariable, DecodedRecord<S::Value>)>> {
        self.finished = true;
        let claimed_end = claimed_end.min(self.region.len());
        if self.written_from(claimed_end).is_none() {
            self.torn_tail = Some(TornTail {
                offset: self.offset as u64,
                end: claimed_end as u64,
            });
            return None;
        }
        Some(Err(CoreError::corrupt_record(self.offset as u64, reason)))
    }
}

impl<S: DatabaseSerializer> Iterator for RecordIterator<'_, S> {
    type Item = CoreResult<(ChangedVariable, DecodedRecord<S::Value>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match read_frame(self.region, self.offset) {
            Frame::End => {
                self.finished = true;
                let written = self.written_from(self.offset)?;
                Some(Err(CoreError::corrupt_record(
                    self.offset as u64,
                    format!("end marker followed by written bytes at offset {written}"),
                )))
            }
            Frame::Bad {
                reason,
                claimed_end,
            } => self.reject(reason, claimed_end),
            Frame::Record { payload, total } => {
                match decode_payload(self.serializer, payload) {
                    Ok(record) => {
                        // total <= MAX_PAYLOAD_SIZE + FRAME_OVERHEAD = u32::MAX
                        let location = ChangedVariable::new(self.offset as u64, total as u32);
                        self.offset += total;
                        Some(Ok((location, record)))
                    }
                    Err(reason) => self.reject(reason, self.offset + total),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::record::encode_record;
    use skdb_codec::{CborSerializer, Value, VariablePath};

    fn region(records: &[(&str, Option<i64>)], capacity: usize) -> (Vec<u8>, Vec<usize>) {
        let serializer = CborSerializer::new();
        let mut data = Vec::new();
        let mut sizes = Vec::new();
        let mut scratch = Vec::new();
        for (path, value) in records {
            let value = value.map(Value::Integer);
            let size = encode_record(
                &serializer,
                &VariablePath::parse(path),
                value.as_ref(),
                &mut scratch,
            )
            .unwrap();
            data.extend_from_slice(&scratch);
            sizes.push(size);
        }
        data.resize(capacity.max(data.len()), 0);
        (data, sizes)
    }

    #[test]
    fn yields_records_in_order() {
        let (data, sizes) = region(&[("x", Some(1)), ("y", None)], 128);
        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);

        let (loc, rec) = iter.next().unwrap().unwrap();
        assert_eq!(loc, ChangedVariable::new(0, sizes[0] as u32));
        assert_eq!(rec.path, VariablePath::parse("x"));
        assert_eq!(rec.value, Some(Value::Integer(1)));

        let (loc, rec) = iter.next().unwrap().unwrap();
        assert_eq!(loc.position, sizes[0] as u64);
        assert_eq!(rec.value, None);

        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        assert_eq!(iter.position(), (sizes[0] + sizes[1]) as u64);
        assert_eq!(iter.torn_tail(), None);
    }

    #[test]
    fn region_filled_exactly_ends_cleanly() {
        let (data, sizes) = region(&[("x", Some(1))], 0);
        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert_eq!(iter.position(), sizes[0] as u64);
    }

    #[test]
    fn torn_last_record_is_reported() {
        let (mut data, sizes) = region(&[("x", Some(1)), ("y", Some(2))], 64);
        let last_end = sizes[0] + sizes[1];
        data[last_end - 1] = 0;
        data[last_end - 2] = 0;

        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert_eq!(iter.position(), sizes[0] as u64);
        assert_eq!(
            iter.torn_tail(),
            Some(TornTail {
                offset: sizes[0] as u64,
                end: last_end as u64,
            })
        );
    }

    #[test]
    fn corruption_before_valid_records_is_fatal() {
        let (mut data, _) = region(&[("x", Some(1)), ("y", Some(2))], 64);
        // a payload byte of the first record
        data[6] ^= 0xFF;

        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { offset: 0, .. }));
        assert!(iter.next().is_none());
        assert_eq!(iter.torn_tail(), None);
        assert_eq!(iter.position(), 0);
    }

    #[test]
    fn written_bytes_after_end_marker_are_fatal() {
        let (mut data, sizes) = region(&[("x", Some(1))], 64);
        data[sizes[0] + 3] = 0x55;

        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        match err {
            CoreError::CorruptRecord { offset, reason } => {
                assert_eq!(offset, sizes[0] as u64);
                assert!(reason.contains(&(sizes[0] + 3).to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(iter.next().is_none());
        assert_eq!(iter.torn_tail(), None);
        assert_eq!(iter.position(), sizes[0] as u64);
    }

    #[test]
    fn lost_marker_before_valid_records_is_fatal() {
        let (mut data, sizes) = region(&[("x", Some(1)), ("y", Some(2)), ("z", Some(3))], 128);
        data[sizes[0]] = 0;

        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { offset, .. } if offset == sizes[0] as u64));
        assert!(iter.next().is_none());
    }

    #[test]
    fn overwritten_marker_before_valid_records_is_fatal() {
        let (mut data, sizes) = region(&[("x", Some(1)), ("y", Some(2)), ("z", Some(3))], 128);
        data[sizes[0]] = 0x42;

        let serializer = CborSerializer::new();
        let mut iter = RecordIterator::new(&data, &serializer);
        assert!(iter.next().unwrap().is_ok());
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { offset, .. } if offset == sizes[0] as u64));
        assert_eq!(iter.torn_tail(), None);
    }
}
