//! Canonical CBOR encoder.

use crate::value::{compare_encoded, Value};
use bytes::BufMut;

/// CBOR `undefined` simple value.
pub const UNDEFINED: u8 = 0xf7;

/// Encode a value to canonical CBOR bytes.
///
/// Output is deterministic (RFC 8949 section 4.2.1): map keys are sorted
/// by their encoded form, integers use the shortest encoding, and no
/// indefinite-length items are produced.
pub fn to_canonical_cbor(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new(Vec::new());
    encoder.encode(value);
    encoder.into_inner()
}

/// A canonical CBOR encoder writing into any [`BufMut`].
///
/// Encoding into a caller-owned `&mut Vec<u8>` appends at its end, which is
/// how serializers place several items back to back in one record.
pub struct CanonicalEncoder<B> {
    out: B,
    written: usize,
}

impl<B: BufMut> CanonicalEncoder<B> {
    /// Create an encoder over the given output.
    pub fn new(out: B) -> Self {
        Self { out, written: 0 }
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Consume the encoder and return the output.
    pub fn into_inner(self) -> B {
        self.out
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) {
        match value {
            // CBOR null is simple value 22
            Value::Null => self.put_u8(0xf6),
            Value::Bool(b) => self.put_u8(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Bytes(b) => {
                self.encode_header(2, b.len() as u64);
                self.put_slice(b);
            }
            Value::Text(s) => self.encode_text(s),
            Value::Array(items) => {
                self.encode_array_header(items.len());
                for item in items {
                    self.encode(item);
                }
            }
            Value::Map(pairs) => self.encode_map(pairs),
        }
    }

    /// Encode a text string.
    pub fn encode_text(&mut self, text: &str) {
        self.encode_header(3, text.len() as u64);
        self.put_slice(text.as_bytes());
    }

    /// Encode the header of a definite-length array.
    pub fn encode_array_header(&mut self, len: usize) {
        self.encode_header(4, len as u64);
    }

    /// Encode the `undefined` simple value.
    pub fn encode_undefined(&mut self) {
        self.put_u8(UNDEFINED);
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_header(0, n as u64);
        } else {
            // Negative integers carry -(n + 1), which is in [0, 2^63 - 1]
            self.encode_header(1, (-(n + 1)) as u64);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_header(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.put_u8(mt | value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.put_u8(mt | 24);
            self.put_u8(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.put_u8(mt | 25);
            self.put_slice(&(value as u16).to_be_bytes());
        } else if value <= u64::from(u32::MAX) {
            self.put_u8(mt | 26);
            self.put_slice(&(value as u32).to_be_bytes());
        } else {
            self.put_u8(mt | 27);
            self.put_slice(&value.to_be_bytes());
        }
    }

    fn encode_map(&mut self, pairs: &[(Value, Value)]) {
        let mut encoded: Vec<(Vec<u8>, &Value)> = pairs
            .iter()
            .map(|(key, value)| (to_canonical_cbor(key), value))
            .collect();
        encoded.sort_by(|a, b| compare_encoded(&a.0, &b.0));

        self.encode_header(5, pairs.len() as u64);
        for (key, value) in encoded {
            self.put_slice(&key);
            self.encode(value);
        }
    }

    fn put_u8(&mut self, byte: u8) {
        self.out.put_u8(byte);
        self.written += 1;
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.out.put_slice(bytes);
        self.written += bytes.len();
    }
}
