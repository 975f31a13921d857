// Rust guideline compliant 2026-02-23

//! Feature standardization and seeded k-means.
//!
//! [`segment`] is the entry point used by the pipeline: it standardizes
//! columns, clamps the cluster count to the number of distinct points, and
//! fits [`KMeans`]. Fitting is delegated to `linfa-clustering` (k-means++
//! seeding, Lloyd iterations) driven by a `StdRng` seeded from the caller's
//! `random_state`, so identical inputs always yield identical partitions.

use linfa::DatasetBase;
use linfa::traits::{Fit as _, Predict as _};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{SeedableRng as _, rngs::StdRng};

// ---------------------------------------------------------------------------
// ClusterError
// ---------------------------------------------------------------------------

/// Errors from standardization or clustering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusterError {
    /// The feature matrix has no rows.
    #[error("cannot cluster an empty feature matrix")]
    EmptyInput,
    /// A feature value is NaN or infinite, so distances are undefined.
    #[error("non-finite feature at row {row}, column {column}")]
    NonFinite {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
    },
    /// Requested cluster count is zero or exceeds the number of rows.
    #[error("cannot form {n_clusters} cluster(s) from {n_samples} sample(s)")]
    InvalidClusterCount {
        /// Requested clusters.
        n_clusters: usize,
        /// Available rows.
        n_samples: usize,
    },
    /// Too many rows coincide to seed `n_clusters` distinct centroids.
    ///
    /// Only [`KMeans::fit`] raises this; [`segment`] clamps instead.
    #[error("only {distinct} distinct point(s) for {n_clusters} cluster(s)")]
    TooFewDistinctPoints {
        /// Number of distinct rows.
        distinct: usize,
        /// Requested clusters.
        n_clusters: usize,
    },
    /// The k-means solver itself failed.
    #[error("k-means fit failed: {reason}")]
    Fit {
        /// Solver error message.
        reason: String,
    },
}

fn check_finite(x: &Array2<f64>) -> Result<(), ClusterError> {
    match x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, column), _)) => Err(ClusterError::NonFinite { row, column }),
        None => Ok(()),
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum()
}

// ---------------------------------------------------------------------------
// StandardScaler
// ---------------------------------------------------------------------------

/// Per-column standardization to zero mean and unit (population) variance.
///
/// Constant columns are only centered, so they become all-zero instead of NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Learn column means and standard deviations from `x`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::EmptyInput`] for a matrix without rows, or
    /// [`ClusterError::NonFinite`] if any value is NaN or infinite.
    pub fn fit(x: &Array2<f64>) -> Result<Self, ClusterError> {
        check_finite(x)?;
        let mean = x.mean_axis(Axis(0)).ok_or(ClusterError::EmptyInput)?;
        let std = x.var_axis(Axis(0), 0.0).mapv(f64::sqrt);
        let scale = x
            .axis_iter(Axis(1))
            .zip(std.iter())
            .map(|(col, &s)| {
                let first = col[0];
                if col.iter().all(|&v| v.to_bits() == first.to_bits()) || s <= 0.0 { 1.0 } else { s }
            })
            .collect();
        Ok(Self { mean, scale })
    }

    /// Standardize `x` with the learned parameters.
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }

    /// Map standardized values back to original units.
    #[must_use]
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        x * &self.scale + &self.mean
    }

    /// Learned column means.
    #[must_use]
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Learned column scales (standard deviation, or 1 for constant columns).
    #[must_use]
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

// ---------------------------------------------------------------------------
// KMeans
// ---------------------------------------------------------------------------

/// Seeded k-means settings, fitted with `linfa_clustering::KMeans`.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    n_clusters: usize,
    random_state: u64,
    max_iter: usize,
    tol: f64,
}

/// Result of a k-means fit.
///
/// Every cluster id in `0..centroids.nrows()` has at least one member.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster id of every input row.
    pub labels: Vec<usize>,
    /// `(n_clusters, n_features)` centroid matrix, in the fitted space.
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    /// Seed the solver's RNG was created from.
    pub random_state: u64,
}

impl KMeans {
    /// K-means with `n_clusters` clusters, seed 42, 300 iterations, tolerance `1e-4`.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self { n_clusters, random_state: 42, max_iter: 300, tol: 1e-4 }
    }

    /// Set the initialization seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the tolerance on centroid movement between iterations.
    #[must_use]
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Requested cluster count.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Initialization seed.
    #[must_use]
    pub fn random_state(&self) -> u64 {
        self.random_state
    }

    fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Fit on `x` (rows are samples).
    ///
    /// Stops after `max_iter` iterations or once centroids move less than
    /// `tol`. Clusters the solver leaves empty are dropped and the remaining
    /// ids renumbered in centroid order.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidClusterCount`] if `n_clusters` is zero or
    /// above the row count, [`ClusterError::NonFinite`] for NaN/infinite input,
    /// [`ClusterError::TooFewDistinctPoints`] when fewer than `n_clusters` rows
    /// are distinct, and [`ClusterError::Fit`] if the solver fails.
    pub fn fit(&self, x: &Array2<f64>) -> Result<KMeansFit, ClusterError> {
        let n_samples = x.nrows();
        let k = self.n_clusters;
        if n_samples == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if k == 0 || k > n_samples {
            return Err(ClusterError::InvalidClusterCount { n_clusters: k, n_samples });
        }
        check_finite(x)?;
        let distinct = count_distinct_rows(x);
        if distinct < k {
            return Err(ClusterError::TooFewDistinctPoints { distinct, n_clusters: k });
        }

        let dataset = DatasetBase::from(x.clone());
        let rng = StdRng::seed_from_u64(self.random_state);
        let model = linfa_clustering::KMeans::params_with(k, rng, L2Dist)
            .max_n_iterations(u64::try_from(self.max_iter).unwrap_or(u64::MAX))
            // linfa rejects a zero tolerance.
            .tolerance(self.tol.max(f64::MIN_POSITIVE))
            .fit(&dataset)
            .map_err(|e| {
                tracing::error!("kmeans.fit: {e}");
                ClusterError::Fit { reason: e.to_string() }
            })?;
        let predicted: Array1<usize> = model.predict(x);

        let (labels, centroids) = drop_empty_clusters(&predicted, model.centroids());
        let inertia = inertia(x, &centroids, &labels);
        tracing::debug!(
            "kmeans.fitted: k={} seed={} inertia={inertia}",
            centroids.nrows(),
            self.random_state
        );
        Ok(KMeansFit { labels, centroids, inertia, random_state: self.random_state })
    }
}

fn count_distinct_rows(x: &Array2<f64>) -> usize {
    let mut rows: Vec<Vec<f64>> = x.outer_iter().map(|r| r.to_vec()).collect();
    let lexical = |a: &Vec<f64>, b: &Vec<f64>| {
        a.iter()
            .zip(b)
            .map(|(p, q)| p.total_cmp(q))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    };
    rows.sort_by(lexical);
    rows.dedup_by(|a, b| lexical(a, b).is_eq());
    rows.len()
}

/// Keep populated clusters only, renumbered `0..` in centroid order.
fn drop_empty_clusters(labels: &Array1<usize>, centroids: &Array2<f64>) -> (Vec<usize>, Array2<f64>) {
    let mut counts = vec![0usize; centroids.nrows()];
    for &label in labels {
        counts[label] += 1;
    }
    let kept: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] > 0).collect();
    if kept.len() < counts.len() {
        tracing::debug!("kmeans.empty_clusters: dropped={}", counts.len() - kept.len());
    }

    let mut remap = vec![0usize; counts.len()];
    for (new, &old) in kept.iter().enumerate() {
        remap[old] = new;
    }
    let labels = labels.iter().map(|&l| remap[l]).collect();
    (labels, centroids.select(Axis(0), &kept))
}

fn inertia(x: &Array2<f64>, centroids: &Array2<f64>, labels: &[usize]) -> f64 {
    x.outer_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum()
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Standardize `features` and cluster them with `kmeans`.
///
/// The cluster count is clamped to the number of distinct rows, and therefore
/// never exceeds the row count, without error. Returned centroids live in
/// standardized space.
///
/// # Errors
///
/// Propagates [`ClusterError`] from scaling or fitting.
pub fn segment(features: &Array2<f64>, kmeans: &KMeans) -> Result<KMeansFit, ClusterError> {
    let scaler = StandardScaler::fit(features)?;
    let scaled = scaler.transform(features);
    let distinct = count_distinct_rows(&scaled);
    let k = kmeans.n_clusters().min(distinct);
    if k < kmeans.n_clusters() {
        tracing::debug!(
            "kmeans.clamped: requested={} effective={k} rows={} distinct={distinct}",
            kmeans.n_clusters(),
            features.nrows()
        );
    }
    kmeans.clone().with_n_clusters(k).fit(&scaled)
}
