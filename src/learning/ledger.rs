use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::store::LearningStore;
use crate::domain::{
    LearningEvent, LearningEventDetails, NewPrediction, PredictionRecord, VerificationResult,
};
use crate::error::{PropsightError, Result};

/// Owns the lifecycle of prediction records and their single verification
pub struct PredictionLedger {
    store: Arc<dyn LearningStore>,
    accuracy_tolerance_pct: f64,
    default_model_version: String,
}

impl PredictionLedger {
    pub fn new(
        store: Arc<dyn LearningStore>,
        accuracy_tolerance_pct: f64,
        default_model_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            accuracy_tolerance_pct,
            default_model_version: default_model_version.into(),
        }
    }

    /// Persist a prediction and return its identifier
    #[instrument(skip(self, prediction), fields(sport = %prediction.sport, subject = %prediction.subject))]
    pub async fn record(&self, prediction: NewPrediction, now: DateTime<Utc>) -> Result<Uuid> {
        prediction.validate()?;

        let record = PredictionRecord::from_new(prediction, &self.default_model_version, now);
        self.store.insert_prediction(&record).await?;

        info!(
            "Logged prediction {}: {} - {} = {}",
            record.id, record.subject, record.metric_type, record.predicted_value
        );

        self.store
            .append_event(&LearningEvent::new(
                record.sport,
                LearningEventDetails::PredictionMade {
                    prediction_id: record.id,
                    subject: record.subject.clone(),
                    metric_type: record.metric_type.clone(),
                },
                now,
            ))
            .await?;

        Ok(record.id)
    }

    /// Verify a prediction against its observed outcome.
    ///
    /// Returns the verification together with the prediction it belongs to.
    #[instrument(skip(self, source))]
    pub async fn verify(
        &self,
        prediction_id: Uuid,
        actual_value: f64,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<(PredictionRecord, VerificationResult)> {
        if !actual_value.is_finite() {
            return Err(PropsightError::Validation(
                "actual_value must be a finite number".into(),
            ));
        }
        if source.trim().is_empty() {
            return Err(PropsightError::Validation("source must not be empty".into()));
        }

        let prediction = self
            .store
            .get_prediction(prediction_id)
            .await?
            .ok_or(PropsightError::PredictionNotFound { prediction_id })?;

        let result = VerificationResult::evaluate(
            &prediction,
            actual_value,
            source,
            self.accuracy_tolerance_pct,
            now,
        );

        if let Err(e) = self.store.insert_verification(&result).await {
            if e.is_benign_conflict() {
                warn!("Rejected second verification for prediction {}", prediction_id);
            }
            return Err(e);
        }

        info!(
            "Verified prediction {}: actual={} error={:.3} accurate={}",
            prediction_id, actual_value, result.error, result.is_accurate
        );

        self.store
            .append_event(&LearningEvent::new(
                prediction.sport,
                LearningEventDetails::ResultVerified {
                    prediction_id,
                    is_accurate: result.is_accurate,
                },
                now,
            ))
            .await?;

        Ok((prediction, result))
    }

    pub async fn get(&self, prediction_id: Uuid) -> Result<Option<PredictionRecord>> {
        self.store.get_prediction(prediction_id).await
    }
}
