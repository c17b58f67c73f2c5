use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::store::LearningStore;
use crate::domain::{
    AccuracyMetric, LearningEvent, LearningEventDetails, MetricPeriod, NewRetrainingTrigger,
    RetrainingTrigger, Sport, ALL_METRIC_TYPES,
};
use crate::error::Result;

/// Thresholds deciding when a sport's model is stale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrainingPolicy {
    /// Verified predictions required before accuracy is judged
    pub min_predictions: i64,
    /// Retrain when accuracy (percent) falls strictly below this
    pub accuracy_threshold_pct: f64,
}

impl Default for RetrainingPolicy {
    fn default() -> Self {
        Self {
            min_predictions: 50,
            accuracy_threshold_pct: 70.0,
        }
    }
}

impl RetrainingPolicy {
    /// Reason string when the metric warrants retraining
    pub fn decide(&self, metric: &AccuracyMetric) -> Option<String> {
        if metric.total_predictions < self.min_predictions {
            return None;
        }
        if metric.accuracy_rate >= self.accuracy_threshold_pct {
            return None;
        }
        Some(format!(
            "Accuracy dropped to {:.1}% over {} predictions (threshold {:.1}%)",
            metric.accuracy_rate, metric.total_predictions, self.accuracy_threshold_pct
        ))
    }
}

/// Evaluates the latest daily sport-wide accuracy and emits retraining
/// triggers.
///
/// Evaluations for one sport are serialized in-process, and the store
/// refuses a second trigger for the same daily window, so concurrent
/// evaluations of one accuracy drop emit a single trigger.
pub struct RetrainingMonitor {
    store: Arc<dyn LearningStore>,
    policy: RetrainingPolicy,
    sport_locks: DashMap<Sport, Arc<Mutex<()>>>,
}

impl RetrainingMonitor {
    pub fn new(store: Arc<dyn LearningStore>, policy: RetrainingPolicy) -> Self {
        Self {
            store,
            policy,
            sport_locks: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RetrainingPolicy {
        &self.policy
    }

    /// Per-sport lock shared by evaluations and rollup refreshes
    pub(crate) fn lock_for(&self, sport: Sport) -> Arc<Mutex<()>> {
        self.sport_locks
            .entry(sport)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the trigger emitted by this call, if any
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        sport: Sport,
        now: DateTime<Utc>,
    ) -> Result<Option<RetrainingTrigger>> {
        let lock = self.lock_for(sport);
        let _guard = lock.lock().await;
        self.evaluate_locked(sport, now).await
    }

    /// `evaluate` for callers already holding `lock_for(sport)`
    pub(crate) async fn evaluate_locked(
        &self,
        sport: Sport,
        now: DateTime<Utc>,
    ) -> Result<Option<RetrainingTrigger>> {
        let Some(metric) = self
            .store
            .latest_metric(sport, ALL_METRIC_TYPES, MetricPeriod::Daily)
            .await?
        else {
            debug!("No daily accuracy for {} yet", sport);
            return Ok(None);
        };

        let Some(reason) = self.policy.decide(&metric) else {
            debug!(
                "{} accuracy {:.1}% over {} predictions within policy",
                sport, metric.accuracy_rate, metric.total_predictions
            );
            return Ok(None);
        };

        let candidate = NewRetrainingTrigger {
            sport,
            reason,
            accuracy_at_trigger: metric.accuracy_rate,
            period_start: metric.period_start,
            triggered_at: now,
        };

        let Some(trigger) = self.store.insert_trigger_if_absent(&candidate).await? else {
            debug!(
                "Retraining already triggered for {} in window starting {}",
                sport, metric.period_start
            );
            return Ok(None);
        };

        warn!(
            "Accuracy {:.1}% below threshold {:.1}% for {}. Triggering retrain (trigger {}).",
            trigger.accuracy_at_trigger, self.policy.accuracy_threshold_pct, sport, trigger.id
        );

        self.store
            .append_event(&LearningEvent::new(
                sport,
                LearningEventDetails::RetrainTriggered {
                    trigger_id: trigger.id,
                    accuracy: trigger.accuracy_at_trigger,
                },
                now,
            ))
            .await?;

        info!("Retraining trigger {} recorded for {}", trigger.id, sport);
        Ok(Some(trigger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metric(total: i64, accuracy_rate: f64) -> AccuracyMetric {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let (start, end) = MetricPeriod::Daily.window_containing(now);
        AccuracyMetric {
            sport: Sport::Nba,
            metric_type: ALL_METRIC_TYPES.into(),
            period: MetricPeriod::Daily,
            period_start: start,
            period_end: end,
            total_predictions: total,
            correct_predictions: (total as f64 * accuracy_rate / 100.0).round() as i64,
            accuracy_rate,
            avg_error: 1.0,
            computed_at: now,
        }
    }

    #[test]
    fn test_policy_needs_min_predictions() {
        let policy = RetrainingPolicy::default();
        assert_eq!(policy.decide(&metric(49, 60.0)), None);
        assert!(policy.decide(&metric(50, 69.9)).is_some());
    }

    #[test]
    fn test_policy_threshold_is_strict() {
        let policy = RetrainingPolicy::default();
        assert_eq!(policy.decide(&metric(80, 70.0)), None);
        assert_eq!(policy.decide(&metric(80, 95.0)), None);

        let reason = policy.decide(&metric(80, 55.0)).unwrap();
        assert!(reason.contains("55.0%"));
    }
}
