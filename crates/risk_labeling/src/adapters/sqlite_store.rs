// Rust guideline compliant 2026-02-23

//! `SQLite` adapter for the `LabelStore` port.
//!
//! Each run is one row in `label_runs` plus one row per customer in
//! `customer_segments`, written inside a single transaction. Run ids are
//! append-only: writing the same run twice fails with
//! [`StoreError::DuplicateRun`] and leaves the first write intact.

use domain::{CustomerSegment, LabelRun, LabelStore, StoreError};

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS label_runs (
        run_id            TEXT    PRIMARY KEY,
        snapshot_date     TEXT    NOT NULL,
        n_clusters        INTEGER NOT NULL,
        high_risk_cluster INTEGER NOT NULL,
        random_state      TEXT    NOT NULL,
        created_at        TEXT    NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS customer_segments (
        run_id       TEXT    NOT NULL REFERENCES label_runs(run_id),
        customer_id  TEXT    NOT NULL,
        recency      REAL    NOT NULL,
        frequency    REAL    NOT NULL,
        monetary     REAL    NOT NULL,
        cluster      INTEGER NOT NULL,
        is_high_risk INTEGER NOT NULL,
        PRIMARY KEY (run_id, customer_id)
    )",
];

/// `LabelStore` adapter backed by a `SQLite` database via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteLabelStore {
    pool: sqlx::SqlitePool,
}

impl SqliteLabelStore {
    /// Open or create the database at `db_url` and ensure the schema exists.
    ///
    /// The pool holds a single connection, which also keeps `sqlite::memory:`
    /// databases alive for the lifetime of the store.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::debug!("sqlite.open: url={db_url}");
        Ok(Self { pool })
    }
}

fn to_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|e| {
        tracing::error!("sqlite.write_run: {e}");
        StoreError::Unavailable
    })
}

fn unavailable(op: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        tracing::error!("sqlite.{op}: {e}");
        StoreError::Unavailable
    }
}

impl LabelStore for SqliteLabelStore {
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateRun`] when the run id is already stored,
    /// and [`StoreError::Unavailable`] on any other `sqlx` error. The
    /// transaction is rolled back in both cases.
    async fn write_run(&self, run: &LabelRun, segments: &[CustomerSegment]) -> Result<(), StoreError> {
        let run_id = run.run_id.to_string();
        let mut tx = self.pool.begin().await.map_err(unavailable("begin"))?;

        sqlx::query(
            "INSERT INTO label_runs
             (run_id, snapshot_date, n_clusters, high_risk_cluster, random_state, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&run_id)
        .bind(run.summary.snapshot_date.format("%Y-%m-%d %H:%M:%S").to_string())
        .bind(to_i64(run.summary.n_clusters)?)
        .bind(to_i64(run.summary.high_risk_cluster)?)
        .bind(run.summary.random_state.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                tracing::warn!("sqlite.write_run: duplicate run_id={run_id}");
                StoreError::DuplicateRun { run_id: run.run_id }
            }
            other => unavailable("write_run")(other),
        })?;

        for segment in segments {
            sqlx::query(
                "INSERT INTO customer_segments
                 (run_id, customer_id, recency, frequency, monetary, cluster, is_high_risk)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&run_id)
            .bind(&segment.customer_id)
            .bind(segment.rfm.recency)
            .bind(segment.rfm.frequency)
            .bind(segment.rfm.monetary)
            .bind(to_i64(segment.cluster)?)
            .bind(i64::from(segment.risk_flag()))
            .execute(&mut *tx)
            .await
            .map_err(unavailable("write_run"))?;
        }

        tx.commit().await.map_err(unavailable("commit"))?;
        tracing::info!("sqlite.write_run: run_id={run_id} segments={}", segments.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
