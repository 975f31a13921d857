// Rust guideline compliant 2026-02-23

//! RFM aggregation: per-row extraction and per-customer reduction.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use domain::{Rfm, TransactionTable};
use ndarray::Array2;

use crate::{RfmConfig, RfmError};

/// Naive layouts tried after RFC 3339. `%.f` also accepts a missing fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts with a space separator, which RFC 3339 parsing rejects.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// The typed view of one input row that aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Customer identifier.
    pub customer_id: String,
    /// Amount; `None` for an empty cell.
    pub amount: Option<f64>,
    /// Parsed timestamp; `None` when the cell could not be parsed.
    pub timestamp: Option<NaiveDateTime>,
}

/// RFM aggregates of one customer, before clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    /// Customer identifier.
    pub customer_id: String,
    /// Aggregated features.
    pub rfm: Rfm,
}

/// Parse a timestamp cell leniently.
///
/// Offset-carrying values are converted to UTC and returned without the
/// offset. Plain dates map to midnight. Anything else yields `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn column(table: &TransactionTable, name: &str) -> Result<usize, RfmError> {
    table
        .column_index(name)
        .ok_or_else(|| RfmError::MissingColumn { column: name.to_owned() })
}

/// Pull customer id, amount and timestamp out of every row, in row order.
///
/// # Errors
///
/// Returns [`RfmError::MissingColumn`] for an absent configured column,
/// [`RfmError::MissingCustomerId`] for an empty id, [`RfmError::InvalidAmount`]
/// for a non-numeric amount, and [`RfmError::NoValidTimestamps`] when not a
/// single timestamp parses.
pub fn extract_records(
    table: &TransactionTable,
    config: &RfmConfig,
) -> Result<Vec<TransactionRecord>, RfmError> {
    let id_idx = column(table, &config.id_col)?;
    let amount_idx = column(table, &config.amount_col)?;
    let ts_idx = column(table, &config.datetime_col)?;

    let mut records = Vec::with_capacity(table.len());
    let mut unparsed = 0usize;
    for (row, cells) in table.rows().iter().enumerate() {
        let customer_id = cells[id_idx].as_str();
        if customer_id.is_empty() {
            return Err(RfmError::MissingCustomerId { row });
        }

        let raw_amount = cells[amount_idx].trim();
        let amount = if raw_amount.is_empty() {
            None
        } else {
            match raw_amount.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    return Err(RfmError::InvalidAmount { row, value: raw_amount.to_owned() });
                }
            }
        };

        let timestamp = parse_timestamp(&cells[ts_idx]);
        if timestamp.is_none() {
            unparsed += 1;
        }
        records.push(TransactionRecord { customer_id: customer_id.to_owned(), amount, timestamp });
    }

    if unparsed == records.len() {
        return Err(RfmError::NoValidTimestamps { column: config.datetime_col.clone() });
    }
    if unparsed > 0 {
        tracing::warn!("rfm.timestamps.unparsed: rows={unparsed} column={}", config.datetime_col);
    }
    Ok(records)
}

/// Pick the reference date for Recency.
///
/// Uses `config.snapshot_date` when set, otherwise the latest valid timestamp
/// plus one day, so every default Recency is at least 1.
///
/// # Errors
///
/// Returns [`RfmError::NoValidTimestamps`] if no record has a timestamp,
/// [`RfmError::SnapshotBeforeLatest`] if the explicit date is earlier than the
/// latest transaction, or [`RfmError::InvalidConfig`] if the default date
/// overflows.
pub fn resolve_snapshot(
    records: &[TransactionRecord],
    config: &RfmConfig,
) -> Result<NaiveDateTime, RfmError> {
    let latest = records
        .iter()
        .filter_map(|r| r.timestamp)
        .max()
        .ok_or_else(|| RfmError::NoValidTimestamps { column: config.datetime_col.clone() })?;

    match config.snapshot_date {
        Some(snapshot) if snapshot < latest => Err(RfmError::SnapshotBeforeLatest { snapshot, latest }),
        Some(snapshot) => Ok(snapshot),
        None => latest
            .checked_add_signed(TimeDelta::days(1))
            .ok_or_else(|| RfmError::InvalidConfig { reason: "snapshot date out of range".to_owned() }),
    }
}

#[derive(Default)]
struct Accumulator {
    latest: Option<NaiveDateTime>,
    count: u32,
    total: f64,
}

/// Reduce records to one [`CustomerRfm`] per customer, ordered by customer id.
///
/// Frequency counts the rows with a valid timestamp; Monetary sums every
/// non-empty amount.
///
/// # Errors
///
/// Returns [`RfmError::CustomerWithoutTimestamps`] when a customer has no
/// parseable timestamp at all.
pub fn compute_rfm(
    records: &[TransactionRecord],
    snapshot_date: NaiveDateTime,
) -> Result<Vec<CustomerRfm>, RfmError> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(record.customer_id.as_str()).or_default();
        acc.total += record.amount.unwrap_or(0.0);
        if let Some(ts) = record.timestamp {
            acc.count += 1;
            acc.latest = Some(acc.latest.map_or(ts, |l| l.max(ts)));
        }
    }

    groups
        .into_iter()
        .map(|(customer_id, acc)| {
            let latest = acc
                .latest
                .ok_or_else(|| RfmError::CustomerWithoutTimestamps { customer_id: customer_id.to_owned() })?;
            #[expect(clippy::cast_precision_loss, reason = "day counts are far below 2^52")]
            let recency = (snapshot_date - latest).num_days() as f64;
            Ok(CustomerRfm {
                customer_id: customer_id.to_owned(),
                rfm: Rfm { recency, frequency: f64::from(acc.count), monetary: acc.total },
            })
        })
        .collect()
}

/// `(customers, 3)` matrix of Recency, Frequency, Monetary.
#[must_use]
pub fn feature_matrix(customers: &[CustomerRfm]) -> Array2<f64> {
    Array2::from_shape_fn((customers.len(), 3), |(i, j)| customers[i].rfm.to_array()[j])
}
