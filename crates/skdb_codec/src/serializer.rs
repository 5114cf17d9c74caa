//! The serializer contract used by the journal.

use crate::decoder::CanonicalDecoder;
use crate::encoder::{CanonicalEncoder, UNDEFINED};
use crate::error::{CodecError, CodecResult};
use crate::path::VariablePath;
use crate::value::Value;

/// Encodes variable paths and values into journal records.
///
/// Every encoding must be deterministic and **self-delimiting**: given only
/// a start offset, `read_*` must find where the item ends, because the
/// journal stores a path and a value back to back with nothing in between.
///
/// `write_*` append to `out` and return the number of bytes appended.
/// `read_*` decode starting at `offset` and return the number of bytes
/// consumed.
pub trait DatabaseSerializer: Send + Sync {
    /// The value type stored in variables.
    type Value;

    /// Appends the encoding of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be represented.
    fn write_path(&self, path: &VariablePath, out: &mut Vec<u8>) -> CodecResult<usize>;

    /// Decodes a path starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are truncated or not a path.
    fn read_path(&self, bytes: &[u8], offset: usize) -> CodecResult<(VariablePath, usize)>;

    /// Appends the encoding of `value`, or the deletion marker for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn write_value(&self, value: Option<&Self::Value>, out: &mut Vec<u8>) -> CodecResult<usize>;

    /// Decodes a value or deletion marker starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are truncated or not a value.
    fn read_value(
        &self,
        bytes: &[u8],
        offset: usize,
    ) -> CodecResult<(Option<Self::Value>, usize)>;

    /// Appends the deletion marker.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`DatabaseSerializer::write_value`].
    fn write_deletion_marker(&self, out: &mut Vec<u8>) -> CodecResult<usize> {
        self.write_value(None, out)
    }
}

/// The default serializer: canonical CBOR.
///
/// - a path is an array of text strings
/// - a value is a canonical CBOR [`Value`]
/// - the deletion marker is the simple value `undefined` (`0xf7`), which no
///   [`Value`] encodes to
#[derive(Debug, Clone, Copy, Default)]
pub struct CborSerializer;

impl CborSerializer {
    /// Creates the serializer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DatabaseSerializer for CborSerializer {
    type Value = Value;

    fn write_path(&self, path: &VariablePath, out: &mut Vec<u8>) -> CodecResult<usize> {
        if path.is_root() {
            return Err(CodecError::invalid_path("the root path names no variable"));
        }

        let mut encoder = CanonicalEncoder::new(out);
        encoder.encode_array_header(path.depth());
        for segment in path {
            encoder.encode_text(segment);
        }
        Ok(encoder.written())
    }

    fn read_path(&self, bytes: &[u8], offset: usize) -> CodecResult<(VariablePath, usize)> {
        let mut decoder = CanonicalDecoder::at(bytes, offset);
        let Value::Array(items) = decoder.decode()? else {
            return Err(CodecError::invalid_path("expected an array of segments"));
        };
        if items.is_empty() {
            return Err(CodecError::invalid_path("empty path"));
        }

        let segments = items
            .into_iter()
            .map(|item| match item {
                Value::Text(segment) => Ok(segment),
                other => Err(CodecError::invalid_path(format!(
                    "segment is not text: {other:?}"
                ))),
            })
            .collect::<CodecResult<Vec<_>>>()?;

        Ok((VariablePath::new(segments), decoder.position() - offset))
    }

    fn write_value(&self, value: Option<&Value>, out: &mut Vec<u8>) -> CodecResult<usize> {
        let mut encoder = CanonicalEncoder::new(out);
        match value {
            Some(value) => encoder.encode(value),
            None => encoder.encode_undefined(),
        }
        Ok(encoder.written())
    }

    fn read_value(&self, bytes: &[u8], offset: usize) -> CodecResult<(Option<Value>, usize)> {
        let mut decoder = CanonicalDecoder::at(bytes, offset);
        match decoder.peek_byte() {
            None => Err(CodecError::UnexpectedEof),
            Some(UNDEFINED) => Ok((None, 1)),
            Some(_) => {
                let value = decoder.decode()?;
                Ok((Some(value), decoder.position() - offset))
            }
        }
    }
}
