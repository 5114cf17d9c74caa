//! Dump command implementation.

use super::{read_journal_file, recover_copy, value_to_json, Format};
use crate::error::CliError;
use serde::Serialize;
use skdb_core::{CborSerializer, NoopSink, RecordIterator};
use std::path::Path;

/// One record as printed by `dump`.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Framed size in bytes.
    pub length: u32,
    /// Variable path, `::`-separated.
    pub path: String,
    /// Segments of the path; exact even when a segment contains `::`.
    pub segments: Vec<String>,
    /// The value, or `None` for a deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Whether the record deletes the variable.
    pub deleted: bool,
}

/// Collects records of the journal at `path`.
///
/// By default only the pending change of each path, in path order; with
/// `all`, every valid record in journal order.
pub fn collect(path: &Path, limit: Option<usize>, all: bool) -> Result<Vec<RecordInfo>, CliError> {
    let limit = limit.unwrap_or(usize::MAX);

    if all {
        let data = read_journal_file(path)?;
        let serializer = CborSerializer::new();
        // A corrupt record ends the listing with an error after the good ones
        return RecordIterator::new(&data, &serializer)
            .take(limit)
            .map(|record| -> Result<RecordInfo, CliError> {
                let (location, record) = record?;
                Ok(RecordInfo {
                    offset: location.position,
                    length: location.length,
                    path: record.path.to_string(),
                    segments: record.path.segments().to_vec(),
                    deleted: record.value.is_none(),
                    value: record.value.as_ref().map(value_to_json),
                })
            })
            .collect();
    }

    let (journal, _) = recover_copy(path, &mut NoopSink)?;
    let mut records = Vec::new();
    journal.for_each_change(|_, change| {
        if records.len() >= limit {
            return Ok(false);
        }
        let record = journal.read_change(&change)?;
        records.push(RecordInfo {
            offset: change.position,
            length: change.length,
            path: record.path.to_string(),
            segments: record.path.segments().to_vec(),
            deleted: record.value.is_none(),
            value: record.value.as_ref().map(value_to_json),
        });
        Ok(true)
    })?;
    Ok(records)
}

/// Runs the dump command.
pub fn run(path: &Path, limit: Option<usize>, all: bool, format: Format) -> Result<(), CliError> {
    let records = collect(path, limit, all)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        Format::Text => print_text_output(&records),
    }
    Ok(())
}

fn print_text_output(records: &[RecordInfo]) {
    println!("{:>10} {:>6}  {:<32} VALUE", "OFFSET", "LEN", "PATH");
    println!("{}", "-".repeat(64));
    for record in records {
        let value = match &record.value {
            Some(value) => value.to_string(),
            None => "<deleted>".to_string(),
        };
        println!(
            "{:>10} {:>6}  {:<32} {}",
            record.offset, record.length, record.path, value
        );
    }
    println!();
    println!("Total: {} records", records.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_sample;
    use serde_json::json;
    use skdb_core::{Journal, JournalConfig, Value, VariablePath};

    #[test]
    fn dump_pending_changes() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("variables.journal");
        write_sample(&file);

        let records = collect(&file, None, false).unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["a::b", "gone", "x"]);
        assert_eq!(records[0].value, Some(json!("hi")));
        assert!(records[1].deleted);
        assert_eq!(records[2].value, Some(json!(2)));
    }

    #[test]
    fn dump_all_records_in_journal_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("variables.journal");
        write_sample(&file);

        let records = collect(&file, None, true).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[0].value, Some(json!(1)));
        assert_eq!(records[1].offset, u64::from(records[0].length));

        let limited = collect(&file, Some(2), true).unwrap();
        assert_eq!(limited.len(), 2);
        let limited = collect(&file, Some(1), false).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn segments_tell_apart_paths_with_the_same_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("variables.journal");
        let config = JournalConfig::new().capacity(4096);
        let (mut journal, _) =
            Journal::open_file(&file, &config, CborSerializer::new(), &mut NoopSink).unwrap();
        journal
            .record_change(&VariablePath::new(["a", "b"]), &Value::Integer(1))
            .unwrap();
        journal
            .record_change(&VariablePath::new(["a::b"]), &Value::Integer(2))
            .unwrap();
        journal.close().unwrap();

        let records = collect(&file, None, true).unwrap();
        assert_eq!(records[0].path, records[1].path);
        assert_eq!(records[0].segments, ["a", "b"]);
        assert_eq!(records[1].segments, ["a::b"]);

        let json = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(json["segments"], json!(["a::b"]));
    }
}
