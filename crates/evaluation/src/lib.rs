// Rust guideline compliant 2026-02-23

//! Binary classification metrics for risk models.
//!
//! [`compute_metrics`] thresholds predicted probabilities into hard labels and
//! reports accuracy, precision, recall, F1 and ROC-AUC. [`average_ranks`] is
//! the tie-aware ranking behind ROC-AUC.

/// Probability at or above which a prediction counts as positive.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Errors raised by [`compute_metrics`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// Labels and probabilities differ in length.
    #[error("length mismatch: {labels} label(s), {probabilities} probabilit(ies)")]
    LengthMismatch {
        /// Number of labels.
        labels: usize,
        /// Number of probabilities.
        probabilities: usize,
    },
    /// No samples were given.
    #[error("no samples")]
    Empty,
    /// A label other than 0 or 1.
    #[error("sample {index}: label {label} is not 0 or 1")]
    InvalidLabel {
        /// Sample index.
        index: usize,
        /// Offending label.
        label: u8,
    },
    /// A probability or the threshold is NaN or infinite.
    #[error("non-finite score at sample {index}")]
    NonFinite {
        /// Sample index, or the sample count for the threshold.
        index: usize,
    },
    /// ROC-AUC is undefined with a single class present.
    #[error("only one class present in labels; roc_auc is undefined")]
    SingleClass,
}

/// Metrics of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationMetrics {
    /// Fraction of correct hard predictions.
    pub accuracy: f64,
    /// `tp / (tp + fp)`, 0 when nothing is predicted positive.
    pub precision: f64,
    /// `tp / (tp + fn)`, 0 when there are no positives.
    pub recall: f64,
    /// Harmonic mean of precision and recall, 0 when both are 0.
    pub f1: f64,
    /// Area under the ROC curve of the raw probabilities.
    pub roc_auc: f64,
}

#[derive(Debug, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

#[expect(clippy::cast_precision_loss, reason = "sample counts stay far below 2^52")]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Compute metrics for `y_true` labels against `y_proba` scores.
///
/// # Errors
///
/// Returns [`MetricsError`] for empty or mismatched inputs, labels outside
/// `{0, 1}`, non-finite scores, or a single-class label set.
pub fn compute_metrics(
    y_true: &[u8],
    y_proba: &[f64],
    threshold: f64,
) -> Result<ClassificationMetrics, MetricsError> {
    if y_true.len() != y_proba.len() {
        return Err(MetricsError::LengthMismatch {
            labels: y_true.len(),
            probabilities: y_proba.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MetricsError::Empty);
    }
    if let Some((index, &label)) = y_true.iter().enumerate().find(|(_, l)| **l > 1) {
        return Err(MetricsError::InvalidLabel { index, label });
    }
    if let Some(index) = y_proba.iter().position(|p| !p.is_finite()) {
        return Err(MetricsError::NonFinite { index });
    }
    if !threshold.is_finite() {
        return Err(MetricsError::NonFinite { index: y_proba.len() });
    }

    let mut c = Confusion::default();
    for (&label, &p) in y_true.iter().zip(y_proba) {
        match (label == 1, p >= threshold) {
            (true, true) => c.tp += 1,
            (false, true) => c.fp += 1,
            (false, false) => c.tn += 1,
            (true, false) => c.fn_ += 1,
        }
    }

    let precision = ratio(c.tp, c.tp + c.fp);
    let recall = ratio(c.tp, c.tp + c.fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let metrics = ClassificationMetrics {
        accuracy: ratio(c.tp + c.tn, y_true.len()),
        precision,
        recall,
        f1,
        roc_auc: roc_auc(y_true, y_proba)?,
    };
    tracing::debug!("evaluation.metrics: samples={} {metrics:?}", y_true.len());
    Ok(metrics)
}

/// 1-based ascending ranks; tied values share the mean of their positions.
///
/// Also ranks centroid columns in `rfm::select`.
#[must_use]
#[expect(clippy::float_cmp, reason = "only exact ties share a rank")]
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start+1 ..= end, averaged.
        #[expect(clippy::cast_precision_loss, reason = "sample counts stay far below 2^52")]
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Mann-Whitney form of ROC-AUC over [`average_ranks`].
#[expect(clippy::cast_precision_loss, reason = "sample counts stay far below 2^52")]
fn roc_auc(y_true: &[u8], y_proba: &[f64]) -> Result<f64, MetricsError> {
    let positives = y_true.iter().filter(|&&l| l == 1).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricsError::SingleClass);
    }

    let positive_rank_sum: f64 = average_ranks(y_proba)
        .iter()
        .zip(y_true)
        .filter(|&(_, &label)| label == 1)
        .map(|(rank, _)| rank)
        .sum();

    let (p, n) = (positives as f64, negatives as f64);
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    // ------------------------------------------------------------------
    // average_ranks
    // ------------------------------------------------------------------

    #[test]
    fn ranks_without_ties() {
        assert_eq!(average_ranks(&[30.0, 10.0, 20.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn tied_values_share_the_average_rank() {
        assert_eq!(average_ranks(&[5.0, 1.0, 5.0, 7.0]), vec![2.5, 1.0, 2.5, 4.0]);
        assert_eq!(average_ranks(&[2.0, 2.0, 2.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn ranks_of_empty_input() {
        assert!(average_ranks(&[]).is_empty());
    }

    // ------------------------------------------------------------------
    // compute_metrics
    // ------------------------------------------------------------------

    #[test]
    fn perfect_separation() {
        let m = compute_metrics(&[0, 1, 1, 0], &[0.1, 0.8, 0.6, 0.4], DEFAULT_THRESHOLD).unwrap();
        assert!(close(m.accuracy, 1.0));
        assert!(close(m.precision, 1.0));
        assert!(close(m.recall, 1.0));
        assert!(close(m.f1, 1.0));
        assert!(close(m.roc_auc, 1.0));
    }

    #[test]
    fn mixed_predictions() {
        // Hard predictions at 0.5: [1, 1, 0, 0] against [1, 0, 1, 0].
        let m = compute_metrics(&[1, 0, 1, 0], &[0.9, 0.7, 0.3, 0.2], DEFAULT_THRESHOLD).unwrap();
        assert!(close(m.accuracy, 0.5));
        assert!(close(m.precision, 0.5));
        assert!(close(m.recall, 0.5));
        assert!(close(m.f1, 0.5));
        // Positive scores 0.9, 0.3 vs negatives 0.7, 0.2: 3 of 4 pairs ordered.
        assert!(close(m.roc_auc, 0.75));
    }

    #[test]
    fn nothing_predicted_positive_gives_zero_not_nan() {
        let m = compute_metrics(&[1, 0, 1], &[0.2, 0.1, 0.3], DEFAULT_THRESHOLD).unwrap();
        assert!(close(m.precision, 0.0));
        assert!(close(m.recall, 0.0));
        assert!(close(m.f1, 0.0));
        assert!(close(m.roc_auc, 1.0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let m = compute_metrics(&[1, 0], &[0.5, 0.4], 0.5).unwrap();
        assert!(close(m.recall, 1.0));
    }

    #[test]
    fn tied_scores_count_half() {
        let m = compute_metrics(&[1, 0], &[0.5, 0.5], DEFAULT_THRESHOLD).unwrap();
        assert!(close(m.roc_auc, 0.5));

        // One tied pair out of four: (3 + 0.5) / 4.
        let m = compute_metrics(&[1, 0, 1, 0], &[0.9, 0.6, 0.6, 0.1], DEFAULT_THRESHOLD).unwrap();
        assert!(close(m.roc_auc, 0.875));
    }

    #[test]
    fn single_class_is_rejected() {
        let err = compute_metrics(&[1, 1], &[0.2, 0.9], DEFAULT_THRESHOLD).unwrap_err();
        assert_eq!(err, MetricsError::SingleClass);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(
            compute_metrics(&[0, 1], &[0.2], DEFAULT_THRESHOLD).unwrap_err(),
            MetricsError::LengthMismatch { labels: 2, probabilities: 1 }
        );
        assert_eq!(compute_metrics(&[], &[], DEFAULT_THRESHOLD).unwrap_err(), MetricsError::Empty);
        assert_eq!(
            compute_metrics(&[0, 2], &[0.2, 0.4], DEFAULT_THRESHOLD).unwrap_err(),
            MetricsError::InvalidLabel { index: 1, label: 2 }
        );
        assert_eq!(
            compute_metrics(&[0, 1], &[0.2, f64::NAN], DEFAULT_THRESHOLD).unwrap_err(),
            MetricsError::NonFinite { index: 1 }
        );
    }
}
