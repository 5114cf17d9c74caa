//! CLI command implementations.
//!
//! Commands never modify the journal file: they read a copy of its bytes
//! and recover that copy in memory, so they can run next to a live writer.

pub mod dump;
pub mod inspect;
pub mod verify;

use crate::error::CliError;
use serde_json::json;
use skdb_codec::Value;
use skdb_core::{CborSerializer, InMemoryBuffer, Journal, RecoveryReport, VariableSink};
use std::path::Path;
use tracing::debug;

/// Output format for commands that support JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Reads the journal file at `path`.
pub fn read_journal_file(path: &Path) -> Result<Vec<u8>, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

/// Recovers an in-memory copy of the journal at `path`.
pub fn recover_copy<K>(
    path: &Path,
    sink: &mut K,
) -> Result<(Journal<InMemoryBuffer, CborSerializer>, RecoveryReport), CliError>
where
    K: VariableSink<Value>,
{
    let data = read_journal_file(path)?;
    debug!(path = %path.display(), bytes = data.len(), "recovering journal copy");
    let buffer = InMemoryBuffer::with_data(data);
    Ok(Journal::open(buffer, CborSerializer::new(), sink)?)
}

/// JSON form of a variable value. Byte strings become lowercase hex.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Integer(n) => json!(n),
        Value::Bytes(bytes) => json!(hex(bytes)),
        Value::Text(text) => json!(text),
        Value::Array(items) => items.iter().map(value_to_json).collect(),
        Value::Map(pairs) => {
            let object = pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(text) => text.clone(),
                        other => value_to_json(other).to_string(),
                    };
                    (key, value_to_json(v))
                })
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(object)
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
