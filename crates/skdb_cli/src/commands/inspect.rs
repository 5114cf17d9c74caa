//! Inspect command implementation.

use super::{recover_copy, Format};
use crate::error::CliError;
use serde::Serialize;
use skdb_core::NoopSink;
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal path.
    pub path: String,
    /// File size, which is the journal capacity.
    pub capacity: u64,
    /// Bytes holding valid records.
    pub used_bytes: u64,
    /// Bytes of records still referenced by the change-tree.
    pub live_bytes: u64,
    /// Bytes of superseded records.
    pub dead_bytes: u64,
    /// Valid records.
    pub records: u64,
    /// Distinct pending paths.
    pub pending_paths: u64,
    /// Offset of a torn final record, if one would be discarded on open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torn_tail: Option<u64>,
    /// Used bytes as a fraction of the capacity.
    pub utilization: f64,
}

/// Collects the inspection result for the journal at `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, CliError> {
    let (journal, report) = recover_copy(path, &mut NoopSink)?;
    let stats = journal.stats();
    Ok(InspectResult {
        path: path.display().to_string(),
        capacity: stats.capacity,
        used_bytes: stats.used_bytes,
        live_bytes: stats.live_bytes,
        dead_bytes: stats.dead_bytes,
        records: stats.records,
        pending_paths: stats.live_records,
        torn_tail: report.torn_tail,
        utilization: stats.utilization(),
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Format) -> Result<(), CliError> {
    let result = inspect(path)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Journal: {}", result.path);
    println!();
    println!("Capacity:       {} bytes", result.capacity);
    println!(
        "Used:           {} bytes ({:.1}%)",
        result.used_bytes,
        result.utilization * 100.0
    );
    println!("  Live:         {} bytes", result.live_bytes);
    println!("  Superseded:   {} bytes", result.dead_bytes);
    println!("Records:        {}", result.records);
    println!("Pending paths:  {}", result.pending_paths);
    if let Some(offset) = result.torn_tail {
        println!("Torn tail:      at offset {offset} (discarded on next open)");
    }
}
