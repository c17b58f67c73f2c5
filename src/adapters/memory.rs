use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    AccuracyMetric, LearningEvent, MetricPeriod, NewRetrainingTrigger, PredictionRecord,
    RetrainingTrigger, Sport, VerificationResult, VerifiedPrediction,
};
use crate::error::{PropsightError, Result};
use crate::learning::aggregator::summarize;
use crate::learning::LearningStore;

type MetricKey = (Sport, String, MetricPeriod, DateTime<Utc>);

#[derive(Default)]
struct State {
    predictions: HashMap<Uuid, PredictionRecord>,
    verifications: HashMap<Uuid, VerificationResult>,
    metrics: HashMap<MetricKey, AccuracyMetric>,
    triggers: Vec<RetrainingTrigger>,
    events: Vec<(i64, LearningEvent)>,
    frozen_at: Option<DateTime<Utc>>,
}

impl State {
    fn now(&self) -> DateTime<Utc> {
        self.frozen_at.unwrap_or_else(Utc::now)
    }

    fn verified_between(
        &self,
        sport: Sport,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<VerifiedPrediction> {
        let mut out: Vec<VerifiedPrediction> = self
            .verifications
            .values()
            .filter(|v| v.verified_at >= start && v.verified_at < end)
            .filter_map(|v| {
                self.predictions
                    .get(&v.prediction_id)
                    .filter(|p| p.sport == sport)
                    .map(|p| VerifiedPrediction {
                        prediction: p.clone(),
                        verification: v.clone(),
                    })
            })
            .collect();
        out.sort_by_key(|v| v.verification.verified_at);
        out
    }

    /// Closed windows, by this store's clock, are never written
    fn upsert_metric(&mut self, metric: &AccuracyMetric) -> bool {
        if !metric.is_open_at(self.now()) {
            return false;
        }
        let key = (
            metric.sport,
            metric.metric_type.clone(),
            metric.period,
            metric.period_start,
        );
        self.metrics.insert(key, metric.clone());
        true
    }
}

/// Process-local store for tests and database-less runs.
///
/// Every operation runs under one lock, which gives the same uniqueness
/// guarantees the Postgres constraints do. The clock deciding which metric
/// windows are closed is the wall clock unless frozen.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose clock reads `at` until moved with `freeze_clock`
    pub fn with_frozen_clock(at: DateTime<Utc>) -> Self {
        Self {
            state: RwLock::new(State {
                frozen_at: Some(at),
                ..State::default()
            }),
        }
    }

    pub async fn freeze_clock(&self, at: DateTime<Utc>) {
        self.state.write().await.frozen_at = Some(at);
    }

    pub async fn triggers(&self) -> Vec<RetrainingTrigger> {
        self.state.read().await.triggers.clone()
    }

    pub async fn events(&self) -> Vec<LearningEvent> {
        self.state
            .read()
            .await
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn prediction_count(&self) -> usize {
        self.state.read().await.predictions.len()
    }

    pub async fn verification_count(&self) -> usize {
        self.state.read().await.verifications.len()
    }
}

#[async_trait]
impl LearningStore for InMemoryStore {
    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.predictions.contains_key(&record.id) {
            return Err(PropsightError::Storage(format!(
                "duplicate prediction id {}",
                record.id
            )));
        }
        state.predictions.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<PredictionRecord>> {
        Ok(self.state.read().await.predictions.get(&prediction_id).cloned())
    }

    async fn insert_verification(&self, result: &VerificationResult) -> Result<()> {
        let mut state = self.state.write().await;
        let prediction_id = result.prediction_id;

        if !state.predictions.contains_key(&prediction_id) {
            return Err(PropsightError::PredictionNotFound { prediction_id });
        }
        if state.verifications.contains_key(&prediction_id) {
            return Err(PropsightError::AlreadyVerified { prediction_id });
        }
        state.verifications.insert(prediction_id, result.clone());
        Ok(())
    }

    async fn get_verification(&self, prediction_id: Uuid) -> Result<Option<VerificationResult>> {
        Ok(self
            .state
            .read()
            .await
            .verifications
            .get(&prediction_id)
            .cloned())
    }

    async fn verified_between(
        &self,
        sport: Sport,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VerifiedPrediction>> {
        Ok(self.state.read().await.verified_between(sport, start, end))
    }

    async fn upsert_metric(&self, metric: &AccuracyMetric) -> Result<bool> {
        Ok(self.state.write().await.upsert_metric(metric))
    }

    async fn refresh_window(
        &self,
        sport: Sport,
        period: MetricPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>> {
        // Read and write under one write lock
        let mut state = self.state.write().await;
        if end <= state.now() {
            return Ok(Vec::new());
        }

        let verified = state.verified_between(sport, start, end);
        let mut written = Vec::new();
        for metric in summarize(sport, period, start, end, &verified, computed_at) {
            if state.upsert_metric(&metric) {
                written.push(metric);
            }
        }
        Ok(written)
    }

    async fn latest_metric(
        &self,
        sport: Sport,
        metric_type: &str,
        period: MetricPeriod,
    ) -> Result<Option<AccuracyMetric>> {
        Ok(self
            .state
            .read()
            .await
            .metrics
            .values()
            .filter(|m| m.sport == sport && m.period == period && m.metric_type == metric_type)
            .max_by_key(|m| m.period_start)
            .cloned())
    }

    async fn metrics_since(
        &self,
        sport: Sport,
        period: MetricPeriod,
        since: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>> {
        let state = self.state.read().await;
        let mut out: Vec<AccuracyMetric> = state
            .metrics
            .values()
            .filter(|m| m.sport == sport && m.period == period && m.period_start >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.period_start
                .cmp(&a.period_start)
                .then_with(|| a.metric_type.cmp(&b.metric_type))
        });
        Ok(out)
    }

    async fn insert_trigger_if_absent(
        &self,
        trigger: &NewRetrainingTrigger,
    ) -> Result<Option<RetrainingTrigger>> {
        let mut state = self.state.write().await;
        let exists = state
            .triggers
            .iter()
            .any(|t| t.sport == trigger.sport && t.period_start == trigger.period_start);
        if exists {
            return Ok(None);
        }

        let id = state.triggers.len() as i64 + 1;
        let stored = RetrainingTrigger::from_new(id, trigger.clone());
        state.triggers.push(stored.clone());
        Ok(Some(stored))
    }

    async fn append_event(&self, event: &LearningEvent) -> Result<i64> {
        let mut state = self.state.write().await;
        let id = state.events.len() as i64 + 1;
        state.events.push((id, event.clone()));
        Ok(id)
    }

    async fn count_triggers_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .state
            .read()
            .await
            .triggers
            .iter()
            .filter(|t| t.sport == sport && t.triggered_at >= since)
            .count() as i64)
    }

    async fn count_events_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .state
            .read()
            .await
            .events
            .iter()
            .filter(|(_, e)| e.sport == sport && e.timestamp >= since)
            .count() as i64)
    }
}
