//! # SkDb Codec
//!
//! Variable paths, variable values and the serializer contract of the SkDb
//! change journal.
//!
//! The journal never looks inside the bytes of a record. It relies on a
//! [`DatabaseSerializer`] to turn a [`VariablePath`] and an optional value
//! into self-delimiting bytes and back. [`CborSerializer`] is the default
//! implementation, built on a canonical CBOR codec:
//!
//! - Integers use the shortest encoding
//! - Map keys are sorted (length-first, then bytewise)
//! - No floats, no indefinite-length items, no tags
//! - Strings must be UTF-8
//!
//! ## Usage
//!
//! ```
//! use skdb_codec::{CborSerializer, DatabaseSerializer, Value, VariablePath};
//!
//! let serializer = CborSerializer::new();
//! let path = VariablePath::parse("players::alice::score");
//!
//! let mut record = Vec::new();
//! let path_len = serializer.write_path(&path, &mut record).unwrap();
//! serializer.write_value(Some(&Value::Integer(42)), &mut record).unwrap();
//!
//! let (decoded, consumed) = serializer.read_path(&record, 0).unwrap();
//! assert_eq!((decoded, consumed), (path, path_len));
//! let (value, _) = serializer.read_value(&record, path_len).unwrap();
//! assert_eq!(value, Some(Value::Integer(42)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod path;
mod serializer;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use path::{VariablePath, SEPARATOR};
pub use serializer::{CborSerializer, DatabaseSerializer};
pub use value::Value;
