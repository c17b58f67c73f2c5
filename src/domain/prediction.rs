use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::Sport;
use crate::error::{PropsightError, Result};

/// Floor for |actual| when turning an error into a percentage
pub const ERROR_PERCENT_EPSILON: f64 = 1e-9;

/// Per-feature importance reported by the model that produced a prediction.
///
/// The payload is versioned; only `schema_version = 1` is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub schema_version: u32,
    pub features: BTreeMap<String, f64>,
}

impl FeatureImportance {
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    pub fn new(features: BTreeMap<String, f64>) -> Self {
        Self {
            schema_version: Self::CURRENT_SCHEMA_VERSION,
            features,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != Self::CURRENT_SCHEMA_VERSION {
            return Err(PropsightError::Validation(format!(
                "unsupported feature_importance schema_version {} (expected {})",
                self.schema_version,
                Self::CURRENT_SCHEMA_VERSION
            )));
        }
        for (name, weight) in &self.features {
            if name.trim().is_empty() {
                return Err(PropsightError::Validation(
                    "feature_importance contains an empty feature name".into(),
                ));
            }
            if !weight.is_finite() {
                return Err(PropsightError::Validation(format!(
                    "feature_importance['{name}'] is not a finite number"
                )));
            }
        }
        Ok(())
    }
}

/// A prediction as submitted for logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub sport: Sport,
    pub subject: String,
    #[serde(default)]
    pub team: Option<String>,
    pub opponent: String,
    pub scheduled_at: DateTime<Utc>,
    pub metric_type: String,
    pub predicted_value: f64,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub feature_importance: Option<FeatureImportance>,
}

impl NewPrediction {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("subject", &self.subject),
            ("opponent", &self.opponent),
            ("metric_type", &self.metric_type),
        ] {
            if value.trim().is_empty() {
                return Err(PropsightError::Validation(format!("{field} must not be empty")));
            }
        }
        if !self.predicted_value.is_finite() {
            return Err(PropsightError::Validation(
                "predicted_value must be a finite number".into(),
            ));
        }
        if let Some(score) = self.confidence_score {
            if !score.is_finite() || score < 0.0 {
                return Err(PropsightError::Validation(
                    "confidence_score must be a non-negative number".into(),
                ));
            }
        }
        if let Some(version) = &self.model_version {
            if version.trim().is_empty() {
                return Err(PropsightError::Validation(
                    "model_version must not be blank when provided".into(),
                ));
            }
        }
        if let Some(importance) = &self.feature_importance {
            importance.validate()?;
        }
        Ok(())
    }
}

/// Persisted prediction; immutable after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub sport: Sport,
    pub subject: String,
    pub team: Option<String>,
    pub opponent: String,
    pub scheduled_at: DateTime<Utc>,
    pub metric_type: String,
    pub predicted_value: f64,
    pub confidence_score: Option<f64>,
    pub model_version: String,
    pub feature_importance: Option<FeatureImportance>,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Assign identity and creation time to a submitted prediction
    pub fn from_new(new: NewPrediction, default_model_version: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sport: new.sport,
            subject: new.subject,
            team: new.team,
            opponent: new.opponent,
            scheduled_at: new.scheduled_at,
            metric_type: new.metric_type,
            predicted_value: new.predicted_value,
            confidence_score: new.confidence_score,
            model_version: new
                .model_version
                .unwrap_or_else(|| default_model_version.to_string()),
            feature_importance: new.feature_importance,
            created_at: now,
        }
    }
}

/// Observed outcome for a prediction; at most one per prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub prediction_id: Uuid,
    pub actual_value: f64,
    /// actual - predicted
    pub error: f64,
    /// |error| / max(|actual|, ε) × 100
    pub error_percent: f64,
    pub is_accurate: bool,
    pub verified_at: DateTime<Utc>,
    pub source: String,
}

impl VerificationResult {
    /// Derive error fields for an observed outcome.
    pub fn evaluate(
        prediction: &PredictionRecord,
        actual_value: f64,
        source: &str,
        accuracy_tolerance_pct: f64,
        verified_at: DateTime<Utc>,
    ) -> Self {
        let error = actual_value - prediction.predicted_value;
        let error_percent = error.abs() / actual_value.abs().max(ERROR_PERCENT_EPSILON) * 100.0;

        Self {
            prediction_id: prediction.id,
            actual_value,
            error,
            error_percent,
            is_accurate: error_percent <= accuracy_tolerance_pct,
            verified_at,
            source: source.to_string(),
        }
    }
}

/// A prediction joined with its verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPrediction {
    pub prediction: PredictionRecord,
    pub verification: VerificationResult,
}
