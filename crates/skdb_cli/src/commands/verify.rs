//! Verify command implementation.

use super::read_journal_file;
use crate::error::CliError;
use skdb_core::{CborSerializer, CoreError, RecordIterator};
use std::collections::BTreeSet;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifyResult {
    /// Number of valid records.
    pub valid_records: u64,
    /// Distinct paths among the valid records.
    pub paths: usize,
    /// End of the last valid record.
    pub end: u64,
    /// Offset of a torn final record.
    pub torn_tail: Option<u64>,
    /// The corruption that would stop the journal from opening.
    pub corruption: Option<String>,
}

impl VerifyResult {
    /// Whether the journal would open.
    pub fn is_ok(&self) -> bool {
        self.corruption.is_none()
    }
}

/// Checks every record of the journal at `path`.
pub fn verify(path: &Path) -> Result<VerifyResult, CliError> {
    let data = read_journal_file(path)?;
    let serializer = CborSerializer::new();
    let mut records = RecordIterator::new(&data, &serializer);

    let mut result = VerifyResult::default();
    let mut paths = BTreeSet::new();
    for record in records.by_ref() {
        match record {
            Ok((_, record)) => {
                result.valid_records += 1;
                paths.insert(record.path);
            }
            Err(err @ CoreError::CorruptRecord { .. }) => {
                result.corruption = Some(err.to_string());
            }
            Err(other) => return Err(other.into()),
        }
    }
    result.paths = paths.len();
    result.end = records.position();
    result.torn_tail = records.torn_tail().map(|torn| torn.offset);
    Ok(result)
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), CliError> {
    println!("Verifying journal at {}", path.display());
    println!();

    let result = verify(path)?;
    println!("  Valid records: {}", result.valid_records);
    println!("  Paths:         {}", result.paths);
    println!("  Records end:   {}", result.end);
    if let Some(offset) = result.torn_tail {
        println!("  Torn tail at offset {offset} (tolerated)");
    }

    println!();
    if result.is_ok() {
        println!("  OK");
        return Ok(());
    }
    println!("  FAILED");
    Err(CliError::VerificationFailed(
        result.corruption.unwrap_or_default(),
    ))
}
