// Rust guideline compliant 2026-02-23

//! DEMO model adapter for the `RiskModel` port.
//!
//! A fixed-weight logistic regression over the five
//! [`super::demo_features::FEATURE_NAMES`]. Named `"DEMO"`, version `"1"`.
//! Stands in for a trained artifact so the scoring path can run end to end.

use domain::{FeatureVector, ModelError, RiskModel};

/// Intercept of the logistic model.
const BIAS: f64 = -2.0;

/// One weight per feature: amount, `ln(1 + |amount|)`, refund flag, hour, weekday.
const WEIGHTS: [f64; 5] = [0.0, 0.25, 1.2, -0.02, 0.05];

/// Concrete adapter for the `domain::RiskModel` port.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoRiskModel;

impl DemoRiskModel {
    fn logit(features: &[f64]) -> f64 {
        BIAS + WEIGHTS.iter().zip(features).map(|(w, x)| w * x).sum::<f64>()
    }
}

impl RiskModel for DemoRiskModel {
    /// Logistic probability of the high-risk class.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFailed`] when the vector width is wrong.
    async fn predict_proba(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if features.len() != WEIGHTS.len() {
            return Err(ModelError::PredictionFailed {
                reason: format!("expected {} features, got {}", WEIGHTS.len(), features.len()),
            });
        }
        let z = Self::logit(features.values());
        let p = 1.0 / (1.0 + (-z).exp());
        tracing::debug!("demo_model.predict_proba: z={z} p={p}");
        Ok(p)
    }

    fn name(&self) -> &str {
        "DEMO"
    }

    fn version(&self) -> &str {
        "1"
    }

    fn n_features(&self) -> usize {
        WEIGHTS.len()
    }
}
