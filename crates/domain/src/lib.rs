// Rust guideline compliant 2026-02-23

//! Shared domain types for the RFM risk-labeling pipeline.
//!
//! Defines the string-celled `TransactionTable`, the per-customer RFM types,
//! `LabeledTable`, the scoring types, and the hexagonal port traits:
//! `FeatureEngineer`, `RiskModel`, and `LabelStore`.
//! All pipeline components depend on this crate.

use chrono::NaiveDateTime;

/// Column names appended to every labeled row, in output order.
pub const RFM_COLUMNS: [&str; 3] = ["Recency", "Frequency", "Monetary"];

/// Column name of the binary high-risk flag.
pub const RISK_FLAG_COLUMN: &str = "is_high_risk";

// ---------------------------------------------------------------------------
// TransactionTable
// ---------------------------------------------------------------------------

/// Errors raised when building or labeling a table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// A row does not have one cell per column.
    #[error("row {row} has {found} cell(s), expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Number of header columns.
        expected: usize,
        /// Number of cells in the row.
        found: usize,
    },
    /// The same column name appears twice in the header.
    #[error("duplicate column: {column}")]
    DuplicateColumn {
        /// Offending column name.
        column: String,
    },
    /// Row-to-customer mapping does not line up with the table.
    #[error("label mismatch: {reason}")]
    LabelMismatch {
        /// Human-readable description.
        reason: String,
    },
}

/// An in-memory table of transaction rows with string cells.
///
/// Column roles (customer id, amount, timestamp) are resolved by name at use
/// sites; every other column is carried through untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TransactionTable {
    /// Build a table from a header and its rows.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] when a header name repeats, or
    /// [`TableError::RaggedRow`] when a row width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(TableError::DuplicateColumn { column: column.clone() });
            }
        }
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(TableError::RaggedRow { row, expected: columns.len(), found: cells.len() });
        }
        Ok(Self { columns, rows })
    }

    /// Header names in column order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in input order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// RFM types
// ---------------------------------------------------------------------------

/// Recency / Frequency / Monetary aggregates of one customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rfm {
    /// Whole days between the snapshot date and the latest transaction.
    pub recency: f64,
    /// Number of transactions with a valid timestamp.
    pub frequency: f64,
    /// Sum of transaction amounts; negative totals are kept as-is.
    pub monetary: f64,
}

impl Rfm {
    /// Feature vector in [`RFM_COLUMNS`] order.
    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.recency, self.frequency, self.monetary]
    }
}

/// One customer's RFM aggregates plus the segment it was assigned to.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSegment {
    /// Customer identifier as it appears in the input table.
    pub customer_id: String,
    /// Aggregated features.
    pub rfm: Rfm,
    /// Cluster id in `[0, n_clusters)`.
    pub cluster: usize,
    /// `true` when `cluster` is the selected high-risk cluster.
    pub is_high_risk: bool,
}

impl CustomerSegment {
    /// The high-risk flag as the `0`/`1` value written to output tables.
    #[must_use]
    pub fn risk_flag(&self) -> u8 {
        u8::from(self.is_high_risk)
    }
}

/// Run-level facts of one segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationSummary {
    /// Reference "now" used for Recency.
    pub snapshot_date: NaiveDateTime,
    /// Effective number of clusters after clamping to the distinct customer points.
    pub n_clusters: usize,
    /// The single cluster id flagged as high risk.
    pub high_risk_cluster: usize,
    /// Seed the k-means initialization was drawn from.
    pub random_state: u64,
}

/// The input table joined with each row's customer segment.
///
/// Row count and order are those of the input table.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    table: TransactionTable,
    customers: Vec<CustomerSegment>,
    /// `row_customer[i]` indexes `customers` for row `i`.
    row_customer: Vec<usize>,
    summary: SegmentationSummary,
}

impl LabeledTable {
    /// Join `table` rows to `customers` through `row_customer`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LabelMismatch`] when `row_customer` has a different
    /// length than the table or points outside `customers`.
    pub fn new(
        table: TransactionTable,
        customers: Vec<CustomerSegment>,
        row_customer: Vec<usize>,
        summary: SegmentationSummary,
    ) -> Result<Self, TableError> {
        if row_customer.len() != table.len() {
            return Err(TableError::LabelMismatch {
                reason: format!("{} label(s) for {} row(s)", row_customer.len(), table.len()),
            });
        }
        if let Some(&idx) = row_customer.iter().find(|&&idx| idx >= customers.len()) {
            return Err(TableError::LabelMismatch {
                reason: format!("customer index {idx} out of {} customer(s)", customers.len()),
            });
        }
        Ok(Self { table, customers, row_customer, summary })
    }

    /// The untouched input table.
    #[must_use]
    pub fn table(&self) -> &TransactionTable {
        &self.table
    }

    /// One entry per distinct customer, ordered by customer id.
    #[must_use]
    pub fn customers(&self) -> &[CustomerSegment] {
        &self.customers
    }

    /// Snapshot date, cluster count, selected cluster and seed.
    #[must_use]
    pub fn summary(&self) -> SegmentationSummary {
        self.summary
    }

    /// Number of labeled rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_customer.len()
    }

    /// `true` when there are no labeled rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_customer.is_empty()
    }

    /// The segment of the customer owning row `row`.
    #[must_use]
    pub fn segment_for_row(&self, row: usize) -> Option<&CustomerSegment> {
        self.row_customer.get(row).map(|&idx| &self.customers[idx])
    }

    /// Rows paired with their customer segment, in input order.
    pub fn labeled_rows(&self) -> impl Iterator<Item = (&[String], &CustomerSegment)> {
        self.table
            .rows()
            .iter()
            .zip(&self.row_customer)
            .map(|(row, &idx)| (row.as_slice(), &self.customers[idx]))
    }

    /// Flatten into a plain table with `Recency, Frequency, Monetary,
    /// is_high_risk` appended to every row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] if the input already used one of
    /// the appended column names.
    pub fn into_augmented_table(self) -> Result<TransactionTable, TableError> {
        let mut columns = self.table.columns;
        columns.extend(RFM_COLUMNS.iter().map(|c| (*c).to_owned()));
        columns.push(RISK_FLAG_COLUMN.to_owned());

        let rows = self
            .table
            .rows
            .into_iter()
            .zip(self.row_customer)
            .map(|(mut row, idx)| {
                let segment = &self.customers[idx];
                row.extend(segment.rfm.to_array().iter().map(f64::to_string));
                row.push(segment.risk_flag().to_string());
                row
            })
            .collect();
        TransactionTable::new(columns, rows)
    }
}

/// A persisted labeling run: a fresh id plus its summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRun {
    /// Unique id of the run (UUID v4).
    pub run_id: uuid::Uuid,
    /// Segmentation facts recorded with the run.
    pub summary: SegmentationSummary,
}

// ---------------------------------------------------------------------------
// Scoring types
// ---------------------------------------------------------------------------

/// A single transaction-like record submitted for risk scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRequest {
    /// Caller-supplied transaction id, echoed in the score.
    pub transaction_id: String,
    /// Customer identifier.
    pub customer_id: String,
    /// Transaction amount; negative for refunds.
    pub amount: f64,
    /// Raw timestamp text, parsed by the feature engineer.
    pub timestamp: String,
}

/// Numeric model input produced by a [`FeatureEngineer`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap raw feature values.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Feature values in schema order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the vector carries no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Scoring result returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskScore {
    /// Echo of [`ScoringRequest::transaction_id`].
    pub transaction_id: String,
    /// Probability of the high-risk class, always within `[0, 1]`.
    pub risk_probability: f64,
    /// Name of the model that produced the score.
    pub model_name: String,
    /// Version of the model that produced the score.
    pub model_version: String,
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors from the `FeatureEngineer` port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    /// A request field could not be turned into a feature.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Request field name.
        field: &'static str,
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `RiskModel` port.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model could not produce a prediction.
    #[error("prediction failed: {reason}")]
    PredictionFailed {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `LabelStore` port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot be reached or refused the write.
    #[error("label store unavailable")]
    Unavailable,
    /// The run was already recorded.
    #[error("run {run_id} already stored")]
    DuplicateRun {
        /// Id of the conflicting run.
        run_id: uuid::Uuid,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: inference-time feature engineering.
///
/// Must stay schema-consistent with the features the model was trained on;
/// `feature_names().len()` is checked against [`RiskModel::n_features`].
pub trait FeatureEngineer {
    /// Names of the produced features, in vector order.
    fn feature_names(&self) -> &[&'static str];

    /// Turn one request into a feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidInput`] when a field cannot be used.
    fn engineer(&self, request: &ScoringRequest) -> Result<FeatureVector, FeatureError>;
}

/// Hexagonal port: a trained binary classifier.
///
/// The scorer depends exclusively on this trait -- never on a concrete model.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait RiskModel {
    /// Probability of the high-risk class for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFailed`] if inference fails.
    async fn predict_proba(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Name of this model (e.g. `"DEMO"`).
    fn name(&self) -> &str;

    /// Version string of the loaded artifact.
    fn version(&self) -> &str;

    /// Number of input features the model expects.
    fn n_features(&self) -> usize;
}

/// Hexagonal port: persistence of per-customer segments.
///
/// The core never calls this; orchestrating binaries decide whether to persist.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait LabelStore {
    /// Record `run` and every segment computed by it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRun`] when `run.run_id` exists, or
    /// [`StoreError::Unavailable`] on backend failure.
    async fn write_run(&self, run: &LabelRun, segments: &[CustomerSegment]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    fn summary() -> SegmentationSummary {
        SegmentationSummary {
            snapshot_date: chrono::NaiveDate::from_ymd_opt(2025, 12, 16)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            n_clusters: 2,
            high_risk_cluster: 1,
            random_state: 42,
        }
    }

    fn segment(id: &str, cluster: usize, is_high_risk: bool) -> CustomerSegment {
        CustomerSegment {
            customer_id: id.to_owned(),
            rfm: Rfm { recency: 3.0, frequency: 2.0, monetary: 12.5 },
            cluster,
            is_high_risk,
        }
    }

    // ------------------------------------------------------------------
    // TransactionTable
    // ------------------------------------------------------------------

    #[test]
    fn table_reports_shape_and_columns() {
        let table = TransactionTable::new(
            strings(&["CustomerId", "Amount"]),
            vec![strings(&["a", "1"]), strings(&["b", "2"])],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.column_index("Amount"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn table_rejects_ragged_rows() {
        let err = TransactionTable::new(strings(&["a", "b"]), vec![strings(&["1"])]).unwrap_err();
        assert_eq!(err, TableError::RaggedRow { row: 0, expected: 2, found: 1 });
    }

    #[test]
    fn table_rejects_duplicate_columns() {
        let err = TransactionTable::new(strings(&["a", "a"]), vec![]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn { column: "a".to_owned() });
    }

    // ------------------------------------------------------------------
    // LabeledTable
    // ------------------------------------------------------------------

    #[test]
    fn labeled_table_rejects_length_mismatch() {
        let table = TransactionTable::new(strings(&["id"]), vec![strings(&["a"])]).unwrap();
        let result = LabeledTable::new(table, vec![segment("a", 0, false)], vec![], summary());
        assert!(matches!(result, Err(TableError::LabelMismatch { .. })));
    }

    #[test]
    fn labeled_table_rejects_out_of_range_customer() {
        let table = TransactionTable::new(strings(&["id"]), vec![strings(&["a"])]).unwrap();
        let result = LabeledTable::new(table, vec![segment("a", 0, false)], vec![3], summary());
        assert!(matches!(result, Err(TableError::LabelMismatch { .. })));
    }

    #[test]
    fn augmented_table_appends_rfm_and_flag() {
        let table = TransactionTable::new(
            strings(&["id", "note"]),
            vec![strings(&["a", "x"]), strings(&["b", "y"]), strings(&["a", "z"])],
        )
        .unwrap();
        let labeled = LabeledTable::new(
            table,
            vec![segment("a", 0, false), segment("b", 1, true)],
            vec![0, 1, 0],
            summary(),
        )
        .unwrap();
        assert_eq!(labeled.segment_for_row(1).unwrap().customer_id, "b");
        assert_eq!(labeled.labeled_rows().count(), 3);

        let out = labeled.into_augmented_table().unwrap();
        assert_eq!(
            out.columns(),
            strings(&["id", "note", "Recency", "Frequency", "Monetary", "is_high_risk"])
        );
        assert_eq!(out.rows()[1], strings(&["b", "y", "3", "2", "12.5", "1"]));
        assert_eq!(out.rows()[2][5], "0");
    }

    #[test]
    fn risk_flag_is_binary() {
        assert_eq!(segment("a", 0, true).risk_flag(), 1);
        assert_eq!(segment("a", 0, false).risk_flag(), 0);
    }

    // ------------------------------------------------------------------
    // Port errors
    // ------------------------------------------------------------------

    #[test]
    fn port_error_messages() {
        let e = ModelError::PredictionFailed { reason: "nan".to_owned() };
        assert_eq!(e.to_string(), "prediction failed: nan");
        let e = FeatureError::InvalidInput { field: "amount", reason: "not finite".to_owned() };
        assert_eq!(e.to_string(), "invalid amount: not finite");
        assert_eq!(StoreError::Unavailable.to_string(), "label store unavailable");
    }

    // ------------------------------------------------------------------
    // Port traits -- compile checks
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn port_traits_compile_with_minimal_impl() {
        struct AllPorts {
            stored: RefCell<usize>,
        }

        impl FeatureEngineer for AllPorts {
            fn feature_names(&self) -> &[&'static str] {
                &["amount"]
            }

            fn engineer(&self, request: &ScoringRequest) -> Result<FeatureVector, FeatureError> {
                Ok(FeatureVector::new(vec![request.amount]))
            }
        }

        impl RiskModel for AllPorts {
            async fn predict_proba(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
                Ok(0.25)
            }

            fn name(&self) -> &str {
                "minimal"
            }

            fn version(&self) -> &str {
                "0"
            }

            fn n_features(&self) -> usize {
                1
            }
        }

        impl LabelStore for AllPorts {
            async fn write_run(
                &self,
                _run: &LabelRun,
                segments: &[CustomerSegment],
            ) -> Result<(), StoreError> {
                *self.stored.borrow_mut() += segments.len();
                Ok(())
            }
        }

        let ports = AllPorts { stored: RefCell::new(0) };
        let request = ScoringRequest {
            transaction_id: "t1".to_owned(),
            customer_id: "c1".to_owned(),
            amount: 10.0,
            timestamp: "2025-12-01".to_owned(),
        };
        let features = ports.engineer(&request).unwrap();
        assert_eq!(features.len(), ports.n_features());
        let p = ports.predict_proba(&features).await.unwrap();
        assert!((p - 0.25).abs() < f64::EPSILON);

        let run = LabelRun { run_id: uuid::Uuid::new_v4(), summary: summary() };
        ports.write_run(&run, &[segment("a", 0, true)]).await.unwrap();
        assert_eq!(*ports.stored.borrow(), 1);
    }
}
