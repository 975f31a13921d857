// Rust guideline compliant 2026-02-23

//! DEMO feature engineer for the `FeatureEngineer` port.
//!
//! Derives five numeric features from the amount and timestamp of a single
//! request. The list must match the width of [`super::demo_model::DemoRiskModel`].

use chrono::{Datelike as _, Timelike as _};
use domain::{FeatureEngineer, FeatureError, FeatureVector, ScoringRequest};

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; 5] = ["amount", "log_abs_amount", "is_refund", "hour", "day_of_week"];

/// Stateless adapter for the `domain::FeatureEngineer` port.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoFeatures;

impl FeatureEngineer for DemoFeatures {
    fn feature_names(&self) -> &[&'static str] {
        &FEATURE_NAMES
    }

    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidInput`] for a non-finite amount or an
    /// unparseable timestamp.
    fn engineer(&self, request: &ScoringRequest) -> Result<FeatureVector, FeatureError> {
        let amount = request.amount;
        if !amount.is_finite() {
            return Err(FeatureError::InvalidInput {
                field: "amount",
                reason: format!("{amount} is not a finite number"),
            });
        }
        let ts = rfm::aggregate::parse_timestamp(&request.timestamp).ok_or_else(|| {
            FeatureError::InvalidInput {
                field: "timestamp",
                reason: format!("cannot parse {:?}", request.timestamp),
            }
        })?;

        Ok(FeatureVector::new(vec![
            amount,
            amount.abs().ln_1p(),
            if amount < 0.0 { 1.0 } else { 0.0 },
            f64::from(ts.hour()),
            f64::from(ts.weekday().num_days_from_monday()),
        ]))
    }
}
