// Rust guideline compliant 2026-02-23

//! High-risk segment selection.
//!
//! Each centroid gets `rank(Frequency) + rank(Monetary) - rank(Recency)`, with
//! ascending average ranks per column from `evaluation::average_ranks`. Ranks
//! are order-based, so standardized and raw centroids give the same answer;
//! the pipeline passes standardized ones.

use evaluation::average_ranks;
use ndarray::Array2;

/// Column positions in the centroid matrix.
const RECENCY: usize = 0;
const FREQUENCY: usize = 1;
const MONETARY: usize = 2;

/// Composite risk score per centroid row; lower means riskier.
#[must_use]
pub fn risk_scores(centroids: &Array2<f64>) -> Vec<f64> {
    let rank = |col: usize| average_ranks(&centroids.column(col).to_vec());
    let (r, f, m) = (rank(RECENCY), rank(FREQUENCY), rank(MONETARY));
    r.iter()
        .zip(&f)
        .zip(&m)
        .map(|((r, f), m)| f + m - r)
        .collect()
}

/// Id of the cluster with the minimum risk score.
///
/// Exact ties resolve to the lowest cluster id. A single centroid is cluster 0.
#[must_use]
pub fn select_high_risk(centroids: &Array2<f64>) -> usize {
    let scores = risk_scores(centroids);
    tracing::debug!("rfm.selector.scores: {scores:?}");
    scores
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &s)| if s < best.1 { (i, s) } else { best })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn tied_centroid_columns_share_ranks() {
        // Recency ties between clusters 0 and 1: both get rank 1.5.
        let centroids = array![[0.0, 1.0, 1.0], [0.0, 2.0, 2.0], [1.0, 3.0, 3.0]];
        assert_eq!(risk_scores(&centroids), vec![2.0 - 1.5, 4.0 - 1.5, 6.0 - 3.0]);
        assert_eq!(select_high_risk(&centroids), 0);
    }

    #[test]
    fn picks_stale_rare_low_spend_cluster() {
        // Columns: recency, frequency, monetary.
        let centroids = array![
            [-1.0, 1.0, 1.0],  // recent, frequent, big spender
            [1.5, -1.0, -1.0], // dormant, rare, small spender
            [0.0, 0.0, 0.0],
        ];
        assert_eq!(risk_scores(&centroids), vec![3.0 + 3.0 - 1.0, 1.0 + 1.0 - 3.0, 2.0 + 2.0 - 2.0]);
        assert_eq!(select_high_risk(&centroids), 1);
    }

    #[test]
    fn exact_score_tie_goes_to_lowest_id() {
        let centroids = array![[0.0, 0.0, 0.0], [1.0, 2.0, 5.0], [0.0, 0.0, 0.0]];
        // Clusters 0 and 2 are identical and tie for the minimum.
        let scores = risk_scores(&centroids);
        assert!((scores[0] - scores[2]).abs() < f64::EPSILON);
        assert_eq!(select_high_risk(&centroids), 0);
    }

    #[test]
    fn single_cluster_is_selected() {
        assert_eq!(select_high_risk(&array![[0.0, 0.0, 0.0]]), 0);
    }

    #[test]
    fn ranking_is_scale_invariant() {
        let standardized = array![[-1.2, 0.3, 0.9], [0.4, -0.8, -1.1], [0.8, 0.5, 0.2]];
        let raw = standardized.mapv(|v| v * 40.0 + 100.0);
        assert_eq!(select_high_risk(&standardized), select_high_risk(&raw));
    }
}
