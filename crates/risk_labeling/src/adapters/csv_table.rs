// Rust guideline compliant 2026-02-23

//! CSV file adapter for [`TransactionTable`].
//!
//! The first record is the header. Cells are kept as raw strings; typing
//! happens in the labeling core.

use std::path::Path;

use anyhow::Context as _;
use domain::TransactionTable;

/// Read a headed CSV file into a table.
///
/// # Errors
///
/// Fails when the file cannot be opened, a record is malformed or has the
/// wrong number of fields, or the header repeats a column name.
pub fn read_table(path: &Path) -> anyhow::Result<TransactionTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: bad record {i}", path.display()))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    tracing::debug!("csv.read: path={} rows={}", path.display(), rows.len());

    TransactionTable::new(columns, rows).with_context(|| format!("invalid table in {}", path.display()))
}

/// Write `table` as a headed CSV file, replacing any existing file.
///
/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn write_table(path: &Path, table: &TransactionTable) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    tracing::debug!("csv.write: path={} rows={}", path.display(), table.len());
    Ok(())
}
