use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AccuracyMetric, LearningEvent, MetricPeriod, NewRetrainingTrigger, PredictionRecord,
    RetrainingTrigger, Sport, VerificationResult, VerifiedPrediction,
};
use crate::error::Result;

/// Persistence seam for the learning loop.
///
/// Implementations must enforce two invariants themselves rather than
/// relying on callers:
/// - `insert_verification` admits at most one verification per prediction;
///   a second attempt fails with `AlreadyVerified`, even under concurrency.
/// - `insert_trigger_if_absent` admits at most one trigger per
///   `(sport, period_start)` and returns `None` for the losers.
///
/// Whether a metric window is closed is decided by the store's own clock,
/// never by a timestamp the caller passes in.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn insert_prediction(&self, record: &PredictionRecord) -> Result<()>;

    async fn get_prediction(&self, prediction_id: Uuid) -> Result<Option<PredictionRecord>>;

    /// Persist a verification. Fails with `PredictionNotFound` for an unknown
    /// prediction and `AlreadyVerified` when one already exists.
    async fn insert_verification(&self, result: &VerificationResult) -> Result<()>;

    async fn get_verification(&self, prediction_id: Uuid) -> Result<Option<VerificationResult>>;

    /// Verified predictions of a sport with `start <= verified_at < end`
    async fn verified_between(
        &self,
        sport: Sport,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VerifiedPrediction>>;

    /// Insert or update a metric row. Windows already closed by the store's
    /// clock are left untouched; returns whether a row was written.
    async fn upsert_metric(&self, metric: &AccuracyMetric) -> Result<bool>;

    /// Recompute the rollups of one window from every verification committed
    /// in it and store them, stamped with `computed_at`.
    ///
    /// Refreshes of one sport are serialized, and the read happens after the
    /// previous refresh wrote, so the last refresh always counts every
    /// committed verification. A window closed by the store's clock is not
    /// written. Returns the rows written.
    async fn refresh_window(
        &self,
        sport: Sport,
        period: MetricPeriod,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>>;

    /// Most recent window of a (sport, metric type, period)
    async fn latest_metric(
        &self,
        sport: Sport,
        metric_type: &str,
        period: MetricPeriod,
    ) -> Result<Option<AccuracyMetric>>;

    /// Metrics whose window starts at or after `since`, newest first
    async fn metrics_since(
        &self,
        sport: Sport,
        period: MetricPeriod,
        since: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>>;

    async fn insert_trigger_if_absent(
        &self,
        trigger: &NewRetrainingTrigger,
    ) -> Result<Option<RetrainingTrigger>>;

    async fn append_event(&self, event: &LearningEvent) -> Result<i64>;

    async fn count_triggers_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64>;

    async fn count_events_since(&self, sport: Sport, since: DateTime<Utc>) -> Result<i64>;
}
