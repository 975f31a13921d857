// Rust guideline compliant 2026-02-23

//! Generic risk scorer for single transactions.
//!
//! [`RiskScorer`] pairs a `domain::FeatureEngineer` with a `domain::RiskModel`
//! and turns one `ScoringRequest` into a `RiskScore`. It owns no feature or
//! model logic; both are injected adapters.

use domain::{FeatureEngineer, FeatureError, ModelError, RiskModel, RiskScore, ScoringRequest};

// ---------------------------------------------------------------------------
// ScorerError
// ---------------------------------------------------------------------------

/// Errors raised while building a scorer or scoring a request.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    /// Feature engineer and model disagree on the number of features.
    #[error("schema mismatch: engineer produces {produced} feature(s), model expects {expected}")]
    SchemaMismatch {
        /// `feature_names().len()` of the engineer.
        produced: usize,
        /// `n_features()` of the model.
        expected: usize,
    },
    /// The request could not be turned into features.
    #[error(transparent)]
    Features(#[from] FeatureError),
    /// The model failed or returned an unusable probability.
    #[error(transparent)]
    Model(#[from] ModelError),
}

// ---------------------------------------------------------------------------
// RiskScorer
// ---------------------------------------------------------------------------

/// Name and version of the model behind a scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model name.
    pub name: String,
    /// Model version.
    pub version: String,
}

/// Scores single requests with an injected feature engineer and model.
#[derive(Debug)]
pub struct RiskScorer<F: FeatureEngineer, M: RiskModel> {
    features: F,
    model: M,
}

impl<F: FeatureEngineer, M: RiskModel> RiskScorer<F, M> {
    /// Pair `features` with `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::SchemaMismatch`] when the engineer's feature
    /// count differs from the model's input width.
    pub fn new(features: F, model: M) -> Result<Self, ScorerError> {
        let produced = features.feature_names().len();
        let expected = model.n_features();
        if produced != expected {
            tracing::error!("scorer.new: schema mismatch produced={produced} expected={expected}");
            return Err(ScorerError::SchemaMismatch { produced, expected });
        }
        tracing::info!(
            "scorer.new: model={} version={} features={produced}",
            model.name(),
            model.version()
        );
        Ok(Self { features, model })
    }

    /// Which model this scorer serves.
    #[must_use]
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model.name().to_owned(),
            version: self.model.version().to_owned(),
        }
    }

    /// Score one request.
    ///
    /// The model output is clamped into `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::Features`] if feature engineering fails, and
    /// [`ScorerError::Model`] if prediction fails or yields `NaN`.
    pub async fn score(&self, request: &ScoringRequest) -> Result<RiskScore, ScorerError> {
        let vector = self.features.engineer(request)?;
        if vector.len() != self.model.n_features() {
            return Err(ScorerError::SchemaMismatch {
                produced: vector.len(),
                expected: self.model.n_features(),
            });
        }

        let raw = self.model.predict_proba(&vector).await?;
        if raw.is_nan() {
            return Err(ModelError::PredictionFailed { reason: "model returned NaN".to_owned() }.into());
        }
        let risk_probability = raw.clamp(0.0, 1.0);
        tracing::debug!(
            "scorer.score: transaction_id={} raw={raw} risk_probability={risk_probability}",
            request.transaction_id
        );

        Ok(RiskScore {
            transaction_id: request.transaction_id.clone(),
            risk_probability,
            model_name: self.model.name().to_owned(),
            model_version: self.model.version().to_owned(),
        })
    }
}
