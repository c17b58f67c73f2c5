//! Prediction accuracy feedback loop
//!
//! Closes the loop between projections and outcomes:
//! - `PredictionLedger` records predictions and their single verification
//! - `AccuracyAggregator` rolls verifications up per sport and period
//! - `RetrainingMonitor` decides when a sport's model is stale
//!
//! `ContinuousLearning` wires the three together over one injected store.

pub mod aggregator;
pub mod ledger;
pub mod monitor;
pub mod store;

pub use aggregator::AccuracyAggregator;
pub use ledger::PredictionLedger;
pub use monitor::{RetrainingMonitor, RetrainingPolicy};
pub use store::LearningStore;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::LearningConfig;
use crate::domain::{
    AccuracyMetric, LearningSummary, MetricPeriod, NewPrediction, RetrainingTrigger, Sport,
    VerificationResult,
};
use crate::error::{PropsightError, Result};

/// Result of a verification plus what the follow-up evaluation decided
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VerificationOutcome {
    pub result: VerificationResult,
    pub retraining_trigger: Option<RetrainingTrigger>,
}

pub struct ContinuousLearning {
    store: Arc<dyn LearningStore>,
    ledger: PredictionLedger,
    aggregator: AccuracyAggregator,
    monitor: RetrainingMonitor,
}

impl ContinuousLearning {
    pub fn new(store: Arc<dyn LearningStore>, config: &LearningConfig) -> Self {
        let policy = RetrainingPolicy {
            min_predictions: config.min_predictions,
            accuracy_threshold_pct: config.accuracy_threshold_pct,
        };

        Self {
            ledger: PredictionLedger::new(
                store.clone(),
                config.accuracy_tolerance_pct,
                config.default_model_version.clone(),
            ),
            aggregator: AccuracyAggregator::new(store.clone()),
            monitor: RetrainingMonitor::new(store.clone(), policy),
            store,
        }
    }

    pub fn ledger(&self) -> &PredictionLedger {
        &self.ledger
    }

    pub fn aggregator(&self) -> &AccuracyAggregator {
        &self.aggregator
    }

    pub fn monitor(&self) -> &RetrainingMonitor {
        &self.monitor
    }

    pub async fn log_prediction(&self, prediction: NewPrediction) -> Result<Uuid> {
        self.ledger.record(prediction, Utc::now()).await
    }

    pub async fn verify_result(
        &self,
        prediction_id: Uuid,
        actual_value: f64,
        source: &str,
    ) -> Result<VerificationOutcome> {
        self.verify_result_at(prediction_id, actual_value, source, Utc::now())
            .await
    }

    /// Verify, then refresh the sport's rollups and evaluate the retraining
    /// policy. The verification is committed before the follow-up runs; a
    /// follow-up failure is returned to the caller, who can rerun it with
    /// `refresh_sport`.
    pub async fn verify_result_at(
        &self,
        prediction_id: Uuid,
        actual_value: f64,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        let (prediction, result) = self
            .ledger
            .verify(prediction_id, actual_value, source, now)
            .await?;

        let retraining_trigger = self
            .refresh_sport_at(prediction.sport, now)
            .await
            .map_err(|e| {
                error!(
                    "Accuracy follow-up failed after verifying {}: {}",
                    prediction_id, e
                );
                e
            })?;

        Ok(VerificationOutcome {
            result,
            retraining_trigger,
        })
    }

    /// Recompute the open rollups of a sport and evaluate retraining. Reruns
    /// the follow-up of a verification whose accuracy tracking failed.
    #[instrument(skip(self))]
    pub async fn refresh_sport(&self, sport: Sport) -> Result<Option<RetrainingTrigger>> {
        let trigger = self.refresh_sport_at(sport, Utc::now()).await?;
        info!("Refreshed accuracy rollups for {}", sport);
        Ok(trigger)
    }

    /// Rollups and the retraining check of one sport run under one lock, so
    /// a slow refresh cannot overwrite a fresher one.
    async fn refresh_sport_at(
        &self,
        sport: Sport,
        now: DateTime<Utc>,
    ) -> Result<Option<RetrainingTrigger>> {
        let lock = self.monitor.lock_for(sport);
        let _guard = lock.lock().await;

        self.aggregator.recompute_all(sport, now).await?;
        self.monitor.evaluate_locked(sport, now).await
    }

    pub async fn get_accuracy_metrics(
        &self,
        sport: Sport,
        period: MetricPeriod,
        days_back: i64,
    ) -> Result<Vec<AccuracyMetric>> {
        let since = look_back(days_back, Utc::now())?;
        self.store.metrics_since(sport, period, since).await
    }

    pub async fn get_learning_summary(
        &self,
        sport: Sport,
        days_back: i64,
    ) -> Result<LearningSummary> {
        let since = look_back(days_back, Utc::now())?;
        Ok(LearningSummary {
            retraining_events: self.store.count_triggers_since(sport, since).await?,
            learning_events: self.store.count_events_since(sport, since).await?,
        })
    }
}

fn look_back(days_back: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if !(0..=3650).contains(&days_back) {
        return Err(PropsightError::Validation(format!(
            "days_back must be between 0 and 3650, got {days_back}"
        )));
    }
    Ok(now - Duration::days(days_back))
}
