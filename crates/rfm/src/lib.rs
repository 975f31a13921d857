// Rust guideline compliant 2026-02-23

//! RFM risk-labeling core.
//!
//! Aggregates transaction rows into per-customer Recency / Frequency / Monetary
//! features, clusters them with seeded k-means, picks the high-risk segment by
//! rank score, and joins the flag back onto every input row.
//!
//! Entry point: [`add_rfm_target`]. Configuration via [`RfmConfig::builder`].
//! The whole computation is synchronous, in-memory and free of global state.

pub mod aggregate;
pub mod cluster;
pub mod merge;
pub mod select;

use chrono::NaiveDateTime;
use domain::{
    CustomerSegment, LabeledTable, RFM_COLUMNS, RISK_FLAG_COLUMN, SegmentationSummary, TableError,
    TransactionTable,
};

pub use cluster::{ClusterError, KMeans, KMeansFit, StandardScaler};

// ---------------------------------------------------------------------------
// RfmError
// ---------------------------------------------------------------------------

/// Errors that can occur while labeling a transaction table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RfmError {
    /// The supplied configuration is invalid.
    #[error("invalid rfm configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The input table has no rows.
    #[error("input table is empty")]
    EmptyInput,
    /// A configured column is absent from the table.
    #[error("missing column: {column}")]
    MissingColumn {
        /// Configured column name.
        column: String,
    },
    /// The input already has a column the labeling would append.
    #[error("input already has output column {column}")]
    ColumnConflict {
        /// Conflicting column name.
        column: String,
    },
    /// Not a single timestamp in the column could be parsed.
    #[error("no valid timestamps in column {column}")]
    NoValidTimestamps {
        /// Timestamp column name.
        column: String,
    },
    /// A row has an empty customer id.
    #[error("row {row}: empty customer id")]
    MissingCustomerId {
        /// Zero-based row index.
        row: usize,
    },
    /// An amount cell is not a finite number.
    #[error("row {row}: invalid amount {value:?}")]
    InvalidAmount {
        /// Zero-based row index.
        row: usize,
        /// Raw cell content.
        value: String,
    },
    /// Every timestamp of this customer is unparseable, so Recency is undefined.
    #[error("customer {customer_id} has no valid timestamp")]
    CustomerWithoutTimestamps {
        /// Customer identifier.
        customer_id: String,
    },
    /// The explicit snapshot date precedes the latest transaction.
    #[error("snapshot date {snapshot} is before latest transaction {latest}")]
    SnapshotBeforeLatest {
        /// Configured snapshot date.
        snapshot: NaiveDateTime,
        /// Latest valid transaction timestamp.
        latest: NaiveDateTime,
    },
    /// Clustering failed.
    #[error("clustering failed: {0}")]
    Clustering(#[from] ClusterError),
    /// The labeled table could not be assembled.
    #[error("table error: {0}")]
    Table(#[from] TableError),
}

// ---------------------------------------------------------------------------
// RfmConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for [`add_rfm_target`].
///
/// Construct via [`RfmConfig::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct RfmConfig {
    /// Customer identifier column.
    pub id_col: String,
    /// Transaction amount column.
    pub amount_col: String,
    /// Transaction timestamp column.
    pub datetime_col: String,
    /// Reference date for Recency. `None` means latest timestamp + 1 day.
    pub snapshot_date: Option<NaiveDateTime>,
    /// Requested number of segments, clamped to the distinct customer points at run time.
    pub n_clusters: usize,
    /// Seed for k-means++ initialization.
    pub random_state: u64,
    /// Upper bound on Lloyd iterations.
    pub max_iter: usize,
    /// Stop once centroids move less than this between iterations.
    pub tolerance: f64,
}

/// Builder for [`RfmConfig`].
///
/// Obtain via [`RfmConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct RfmConfigBuilder {
    id_col: String,
    amount_col: String,
    datetime_col: String,
    snapshot_date: Option<NaiveDateTime>,
    n_clusters: usize,
    random_state: u64,
    max_iter: usize,
    tolerance: f64,
}

impl RfmConfig {
    /// Create a builder with default column names and clustering parameters.
    ///
    /// Defaults: `CustomerId`, `Amount`, `TransactionStartTime`, no snapshot,
    /// `n_clusters = 3`, `random_state = 42`, `max_iter = 300`, `tolerance = 1e-4`.
    #[must_use]
    pub fn builder() -> RfmConfigBuilder {
        RfmConfigBuilder {
            id_col: "CustomerId".to_owned(),
            amount_col: "Amount".to_owned(),
            datetime_col: "TransactionStartTime".to_owned(),
            snapshot_date: None,
            n_clusters: 3,
            random_state: 42,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

impl Default for RfmConfig {
    fn default() -> Self {
        let b = Self::builder();
        Self {
            id_col: b.id_col,
            amount_col: b.amount_col,
            datetime_col: b.datetime_col,
            snapshot_date: b.snapshot_date,
            n_clusters: b.n_clusters,
            random_state: b.random_state,
            max_iter: b.max_iter,
            tolerance: b.tolerance,
        }
    }
}

impl RfmConfigBuilder {
    /// Override the customer id column.
    #[must_use]
    pub fn id_col(mut self, id_col: impl Into<String>) -> Self {
        self.id_col = id_col.into();
        self
    }

    /// Override the amount column.
    #[must_use]
    pub fn amount_col(mut self, amount_col: impl Into<String>) -> Self {
        self.amount_col = amount_col.into();
        self
    }

    /// Override the timestamp column.
    #[must_use]
    pub fn datetime_col(mut self, datetime_col: impl Into<String>) -> Self {
        self.datetime_col = datetime_col.into();
        self
    }

    /// Pin the snapshot date instead of deriving it from the data.
    #[must_use]
    pub fn snapshot_date(mut self, snapshot_date: NaiveDateTime) -> Self {
        self.snapshot_date = Some(snapshot_date);
        self
    }

    /// Set the requested number of segments.
    #[must_use]
    pub fn n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Fix the k-means seed.
    #[must_use]
    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Override the Lloyd iteration cap.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Override the convergence tolerance.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RfmError::InvalidConfig`] when `n_clusters` or `max_iter` is
    /// zero, `tolerance` is negative or not finite, a column name is empty, or
    /// two column roles share a name.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<RfmConfig, RfmError> {
        let invalid = |reason: &str| Err(RfmError::InvalidConfig { reason: reason.to_owned() });
        if self.n_clusters == 0 {
            return invalid("n_clusters must be >= 1");
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be >= 1");
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return invalid("tolerance must be a finite, non-negative number");
        }
        let cols = [&self.id_col, &self.amount_col, &self.datetime_col];
        if cols.iter().any(|c| c.trim().is_empty()) {
            return invalid("column names must not be empty");
        }
        if cols[0] == cols[1] || cols[0] == cols[2] || cols[1] == cols[2] {
            return invalid("id, amount and datetime columns must be distinct");
        }
        Ok(RfmConfig {
            id_col: self.id_col,
            amount_col: self.amount_col,
            datetime_col: self.datetime_col,
            snapshot_date: self.snapshot_date,
            n_clusters: self.n_clusters,
            random_state: self.random_state,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
        })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Label every row of `table` with its customer's RFM features and high-risk flag.
///
/// Steps: aggregate per customer, standardize and cluster with k-means
/// (`n_clusters` clamped to the number of distinct customer points), select
/// the cluster with the lowest `rank(F) + rank(M) - rank(R)` score, and join
/// back by customer id.
/// The output keeps the input row count and order.
///
/// # Errors
///
/// Returns [`RfmError::EmptyInput`] for an empty table,
/// [`RfmError::NoValidTimestamps`] when no timestamp parses, other validation
/// variants for malformed rows, and [`RfmError::Clustering`] when k-means
/// cannot produce a partition.
pub fn add_rfm_target(table: TransactionTable, config: &RfmConfig) -> Result<LabeledTable, RfmError> {
    if table.is_empty() {
        return Err(RfmError::EmptyInput);
    }
    if let Some(column) = RFM_COLUMNS
        .iter()
        .chain(std::iter::once(&RISK_FLAG_COLUMN))
        .find(|c| table.column_index(c).is_some())
    {
        return Err(RfmError::ColumnConflict { column: (*column).to_owned() });
    }

    let records = aggregate::extract_records(&table, config)?;
    let snapshot_date = aggregate::resolve_snapshot(&records, config)?;
    let customers = aggregate::compute_rfm(&records, snapshot_date)?;
    tracing::debug!(
        "rfm.aggregated: rows={} customers={} snapshot={snapshot_date}",
        records.len(),
        customers.len()
    );

    let features = aggregate::feature_matrix(&customers);
    let kmeans = KMeans::new(config.n_clusters)
        .with_random_state(config.random_state)
        .with_max_iter(config.max_iter)
        .with_tolerance(config.tolerance);
    let fit = cluster::segment(&features, &kmeans)?;
    let high_risk_cluster = select::select_high_risk(&fit.centroids);
    let n_clusters = fit.centroids.nrows();
    let random_state = fit.random_state;

    let segments: Vec<CustomerSegment> = customers
        .into_iter()
        .zip(&fit.labels)
        .map(|(customer, &cluster)| CustomerSegment {
            customer_id: customer.customer_id,
            rfm: customer.rfm,
            cluster,
            is_high_risk: cluster == high_risk_cluster,
        })
        .collect();
    let flagged = segments.iter().filter(|s| s.is_high_risk).count();
    tracing::info!(
        n_clusters,
        high_risk_cluster,
        random_state,
        flagged_customers = flagged,
        "rfm.labeled"
    );

    let summary = SegmentationSummary { snapshot_date, n_clusters, high_risk_cluster, random_state };
    merge::merge_labels(table, &records, segments, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // RfmConfig builder
    // ------------------------------------------------------------------

    #[test]
    fn config_defaults() {
        let cfg = RfmConfig::builder().build().unwrap();
        assert_eq!(cfg.id_col, "CustomerId");
        assert_eq!(cfg.amount_col, "Amount");
        assert_eq!(cfg.datetime_col, "TransactionStartTime");
        assert!(cfg.snapshot_date.is_none());
        assert_eq!(cfg.n_clusters, 3);
        assert_eq!(cfg.random_state, 42);
        assert_eq!(cfg.max_iter, 300);
        assert_eq!(cfg, RfmConfig::default());
    }

    #[test]
    fn config_zero_clusters_returns_err() {
        let cfg = RfmConfig::builder().n_clusters(0).build();
        assert!(matches!(cfg, Err(RfmError::InvalidConfig { .. })));
    }

    #[test]
    fn config_zero_max_iter_returns_err() {
        let cfg = RfmConfig::builder().max_iter(0).build();
        assert!(matches!(cfg, Err(RfmError::InvalidConfig { .. })));
    }

    #[test]
    fn config_bad_tolerance_returns_err() {
        assert!(RfmConfig::builder().tolerance(-1.0).build().is_err());
        assert!(RfmConfig::builder().tolerance(f64::NAN).build().is_err());
    }

    #[test]
    fn config_shared_column_returns_err() {
        let cfg = RfmConfig::builder().amount_col("CustomerId").build();
        assert!(matches!(cfg, Err(RfmError::InvalidConfig { .. })));
    }

    #[test]
    fn config_setters_override() {
        let snapshot = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cfg = RfmConfig::builder()
            .id_col("cid")
            .amount_col("amt")
            .datetime_col("ts")
            .snapshot_date(snapshot)
            .n_clusters(5)
            .random_state(7)
            .build()
            .unwrap();
        assert_eq!(cfg.id_col, "cid");
        assert_eq!(cfg.snapshot_date, Some(snapshot));
        assert_eq!(cfg.n_clusters, 5);
        assert_eq!(cfg.random_state, 7);
    }

    // ------------------------------------------------------------------
    // add_rfm_target validation
    // ------------------------------------------------------------------

    fn table(columns: &[&str], rows: &[&[&str]]) -> TransactionTable {
        TransactionTable::new(
            columns.iter().map(|c| (*c).to_owned()).collect(),
            rows.iter().map(|r| r.iter().map(|c| (*c).to_owned()).collect()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_table_is_rejected() {
        let t = table(&["CustomerId", "TransactionStartTime", "Amount"], &[]);
        let err = add_rfm_target(t, &RfmConfig::default()).unwrap_err();
        assert_eq!(err, RfmError::EmptyInput);
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn existing_output_column_is_rejected() {
        let t = table(
            &["CustomerId", "TransactionStartTime", "Amount", "Recency"],
            &[&["1", "2025-12-01", "10", "3"]],
        );
        let err = add_rfm_target(t, &RfmConfig::default()).unwrap_err();
        assert_eq!(err, RfmError::ColumnConflict { column: "Recency".to_owned() });
    }

    #[test]
    fn single_customer_is_flagged() {
        let t = table(
            &["CustomerId", "TransactionStartTime", "Amount"],
            &[&["1", "2025-12-01", "10"], &["1", "2025-12-03", "5"]],
        );
        let labeled = add_rfm_target(t, &RfmConfig::default()).unwrap();
        assert_eq!(labeled.summary().n_clusters, 1);
        assert_eq!(labeled.summary().high_risk_cluster, 0);
        assert!(labeled.labeled_rows().all(|(_, s)| s.is_high_risk));
    }
}
