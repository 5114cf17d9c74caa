//! Journal record framing.

use crate::error::{CoreError, CoreResult};
use bytes::BufMut;
use skdb_codec::{DatabaseSerializer, VariablePath};

/// First byte of every record.
pub const RECORD_MARKER: u8 = 0xA7;

/// A zero byte at a record boundary ends the journal.
pub const END_MARKER: u8 = 0x00;

/// marker (1) + payload length (4)
pub const HEADER_SIZE: usize = 5;

/// Trailing crc32c.
pub const CRC_SIZE: usize = 4;

/// Framing bytes around a payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CRC_SIZE;

/// Largest payload whose framed size still fits a `u32` length.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - FRAME_OVERHEAD;

/// A decoded record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord<V> {
    /// Variable the record belongs to.
    pub path: VariablePath,
    /// New value, or `None` for a deletion.
    pub value: Option<V>,
}

/// Frames `path` and `value` into `out`, replacing its contents.
///
/// Returns the framed size.
///
/// # Errors
///
/// Propagates serializer errors. A payload too large for the length field
/// is reported as [`CoreError::CapacityExceeded`].
pub fn encode_record<S: DatabaseSerializer>(
    serializer: &S,
    path: &VariablePath,
    value: Option<&S::Value>,
    out: &mut Vec<u8>,
) -> CoreResult<usize> {
    out.clear();
    out.put_u8(RECORD_MARKER);
    out.put_u32_le(0);

    let path_len = serializer.write_path(path, out)?;
    let value_len = serializer.write_value(value, out)?;
    let payload_len = path_len + value_len;
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(CoreError::CapacityExceeded {
            requested: (payload_len + FRAME_OVERHEAD) as u64,
            available: u32::MAX as u64,
        });
    }

    out[1..HEADER_SIZE].copy_from_slice(&(payload_len as u32).to_le_bytes());
    let crc = crc32c::crc32c(&out[..]);
    out.put_u32_le(crc);
    Ok(out.len())
}

/// Result of reading the frame at one offset.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame<'a> {
    /// End marker or end of the region.
    End,
    /// A frame whose checksum matches.
    Record {
        /// Path and value bytes.
        payload: &'a [u8],
        /// Framed size.
        total: usize,
    },
    /// A frame that cannot be trusted.
    Bad {
        /// What is wrong with it.
        reason: String,
        /// Exclusive end of the bytes the frame claims.
        claimed_end: usize,
    },
}

/// Reads the frame starting at `offset` in `region`.
pub(crate) fn read_frame(region: &[u8], offset: usize) -> Frame<'_> {
    let capacity = region.len();
    let Some(&marker) = region.get(offset) else {
        return Frame::End;
    };
    if marker == END_MARKER {
        return Frame::End;
    }
    if marker != RECORD_MARKER {
        return Frame::Bad {
            reason: format!("invalid record marker {marker:#04x}"),
            claimed_end: offset + 1,
        };
    }
    if capacity - offset < HEADER_SIZE {
        return Frame::Bad {
            reason: "truncated record header".into(),
            claimed_end: capacity,
        };
    }

    let mut length = [0u8; 4];
    length.copy_from_slice(&region[offset + 1..offset + HEADER_SIZE]);
    let payload_len = u32::from_le_bytes(length) as usize;
    let total = match payload_len.checked_add(FRAME_OVERHEAD) {
        Some(total) if total <= capacity - offset => total,
        _ => {
            return Frame::Bad {
                reason: format!("record length {payload_len} overflows the journal"),
                claimed_end: capacity,
            }
        }
    };

    let crc_at = offset + HEADER_SIZE + payload_len;
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&region[crc_at..crc_at + CRC_SIZE]);
    let stored = u32::from_le_bytes(stored);
    let computed = crc32c::crc32c(&region[offset..crc_at]);
    if stored != computed {
        return Frame::Bad {
            reason: format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
            claimed_end: offset + total,
        };
    }

    Frame::Record {
        payload: &region[offset + HEADER_SIZE..crc_at],
        total,
    }
}

/// Decodes a payload into its path and value.
///
/// The error string describes why the payload is unusable.
pub(crate) fn decode_payload<S: DatabaseSerializer>(
    serializer: &S,
    payload: &[u8],
) -> Result<DecodedRecord<S::Value>, String> {
    let (path, path_len) = serializer
        .read_path(payload, 0)
        .map_err(|e| format!("undecodable path: {e}"))?;
    let (value, value_len) = serializer
        .read_value(payload, path_len)
        .map_err(|e| format!("undecodable value: {e}"))?;
    if path_len + value_len != payload.len() {
        return Err(format!(
            "payload has {} trailing bytes",
            payload.len() - path_len - value_len
        ));
    }
    Ok(DecodedRecord { path, value })
}

/// Decodes one complete framed record.
///
/// # Errors
///
/// Returns [`CoreError::CorruptRecord`] if the bytes are not exactly one
/// valid record.
pub fn decode_record<S: DatabaseSerializer>(
    serializer: &S,
    bytes: &[u8],
    offset: u64,
) -> CoreResult<DecodedRecord<S::Value>> {
    match read_frame(bytes, 0) {
        Frame::Record { payload, total } if total == bytes.len() => {
            decode_payload(serializer, payload).map_err(|reason| CoreError::corrupt_record(offset, reason))
        }
        Frame::Record { total, .. } => Err(CoreError::corrupt_record(
            offset,
            format!("record is {total} bytes, expected {}", bytes.len()),
        )),
        Frame::End => Err(CoreError::corrupt_record(offset, "no record here")),
        Frame::Bad { reason, .. } => Err(CoreError::corrupt_record(offset, reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skdb_codec::{CborSerializer, Value};

    fn framed(path: &str, value: Option<Value>) -> Vec<u8> {
        let mut out = Vec::new();
        encode_record(
            &CborSerializer::new(),
            &VariablePath::parse(path),
            value.as_ref(),
            &mut out,
        )
        .unwrap();
        out
    }

    #[test]
    fn frame_layout() {
        let record = framed("x", Some(Value::Integer(1)));
        // marker, len = 4, [0x81, 0x61, 'x', 0x01], crc
        assert_eq!(record.len(), FRAME_OVERHEAD + 4);
        assert_eq!(record[0], RECORD_MARKER);
        assert_eq!(&record[1..5], &4u32.to_le_bytes());
        assert_eq!(&record[5..9], &[0x81, 0x61, b'x', 0x01]);
        let crc = crc32c::crc32c(&record[..9]);
        assert_eq!(&record[9..], &crc.to_le_bytes());
    }

    #[test]
    fn encode_replaces_scratch_contents() {
        let mut out = vec![0xFF; 64];
        let len = encode_record(
            &CborSerializer::new(),
            &VariablePath::parse("a"),
            None,
            &mut out,
        )
        .unwrap();
        assert_eq!(len, out.len());
        assert_eq!(out[0], RECORD_MARKER);
    }

    #[test]
    fn read_frame_finds_record_and_end() {
        let mut region = framed("x", Some(Value::Integer(1)));
        let total = region.len();
        region.resize(total + 16, 0);

        match read_frame(&region, 0) {
            Frame::Record { payload, total: t } => {
                assert_eq!(t, total);
                assert_eq!(payload.len(), total - FRAME_OVERHEAD);
            }
            other => panic!("unexpected frame {other:?}"),
        }
        assert_eq!(read_frame(&region, total), Frame::End);
        assert_eq!(read_frame(&region, region.len()), Frame::End);
    }

    #[test]
    fn bad_marker_claims_one_byte() {
        let region = [0x42, 0, 0, 0];
        match read_frame(&region, 0) {
            Frame::Bad { claimed_end, .. } => assert_eq!(claimed_end, 1),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn truncated_header_claims_the_rest() {
        let region = [RECORD_MARKER, 3, 0];
        match read_frame(&region, 0) {
            Frame::Bad { claimed_end, .. } => assert_eq!(claimed_end, 3),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn overflowing_length_claims_the_rest() {
        let mut region = vec![RECORD_MARKER];
        region.extend_from_slice(&1000u32.to_le_bytes());
        region.resize(32, 0);
        match read_frame(&region, 0) {
            Frame::Bad { claimed_end, .. } => assert_eq!(claimed_end, 32),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn checksum_mismatch_claims_the_frame() {
        let mut region = framed("x", Some(Value::Integer(1)));
        let total = region.len();
        region[6] ^= 0x01;
        region.resize(total * 2, 0);
        match read_frame(&region, 0) {
            Frame::Bad { reason, claimed_end } => {
                assert_eq!(claimed_end, total);
                assert!(reason.contains("checksum"));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn decode_record_roundtrip() {
        let serializer = CborSerializer::new();
        let record = framed("a::b", Some(Value::Text("hi".into())));
        let decoded = decode_record(&serializer, &record, 0).unwrap();
        assert_eq!(decoded.path, VariablePath::parse("a::b"));
        assert_eq!(decoded.value, Some(Value::Text("hi".into())));

        let deletion = framed("a", None);
        assert_eq!(decode_record(&serializer, &deletion, 0).unwrap().value, None);
    }

    #[test]
    fn payload_with_trailing_bytes_is_rejected() {
        let serializer = CborSerializer::new();
        // path ["x"], value 1, then a stray 0x02, with a valid checksum
        let payload = [0x81, 0x61, b'x', 0x01, 0x02];
        let mut record = vec![RECORD_MARKER];
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        let crc = crc32c::crc32c(&record);
        record.extend_from_slice(&crc.to_le_bytes());

        let err = decode_record(&serializer, &record, 7).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { offset: 7, .. }));
    }
}
