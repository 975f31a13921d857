// Rust guideline compliant 2026-02-23

//! Many-to-one join of customer segments back onto transaction rows.

use std::collections::HashMap;

use domain::{CustomerSegment, LabeledTable, SegmentationSummary, TableError, TransactionTable};

use crate::RfmError;
use crate::aggregate::TransactionRecord;

/// Attach each row's customer segment, keeping row count and order.
///
/// `records` must be the per-row extraction of `table`.
///
/// # Errors
///
/// Returns [`RfmError::Table`] if a row's customer has no segment or the
/// record count differs from the table.
pub fn merge_labels(
    table: TransactionTable,
    records: &[TransactionRecord],
    segments: Vec<CustomerSegment>,
    summary: SegmentationSummary,
) -> Result<LabeledTable, RfmError> {
    let index: HashMap<&str, usize> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| (s.customer_id.as_str(), i))
        .collect();

    let row_customer = records
        .iter()
        .enumerate()
        .map(|(row, r)| {
            index.get(r.customer_id.as_str()).copied().ok_or_else(|| TableError::LabelMismatch {
                reason: format!("row {row}: no segment for customer {}", r.customer_id),
            })
        })
        .collect::<Result<Vec<usize>, TableError>>()?;

    Ok(LabeledTable::new(table, segments, row_customer, summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Rfm;

    fn summary() -> SegmentationSummary {
        SegmentationSummary {
            snapshot_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 16)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            n_clusters: 2,
            high_risk_cluster: 0,
            random_state: 42,
        }
    }

    fn segment(id: &str, cluster: usize) -> CustomerSegment {
        CustomerSegment {
            customer_id: id.to_owned(),
            rfm: Rfm { recency: 1.0, frequency: 1.0, monetary: 1.0 },
            cluster,
            is_high_risk: cluster == 0,
        }
    }

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord { customer_id: id.to_owned(), amount: Some(1.0), timestamp: None }
    }

    fn table(ids: &[&str]) -> TransactionTable {
        TransactionTable::new(
            vec!["CustomerId".to_owned()],
            ids.iter().map(|id| vec![(*id).to_owned()]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn keeps_row_count_and_order() {
        let ids = ["b", "a", "b", "b"];
        let records: Vec<_> = ids.iter().map(|id| record(id)).collect();
        let labeled =
            merge_labels(table(&ids), &records, vec![segment("a", 1), segment("b", 0)], summary())
                .unwrap();
        assert_eq!(labeled.len(), 4);
        let got: Vec<(&str, bool)> = labeled
            .labeled_rows()
            .map(|(row, s)| (row[0].as_str(), s.is_high_risk))
            .collect();
        assert_eq!(got, [("b", true), ("a", false), ("b", true), ("b", true)]);
    }

    #[test]
    fn unknown_customer_is_an_error() {
        let records = [record("zz")];
        let err = merge_labels(table(&["zz"]), &records, vec![segment("a", 0)], summary()).unwrap_err();
        assert!(matches!(err, RfmError::Table(TableError::LabelMismatch { .. })));
    }
}
