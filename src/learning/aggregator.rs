use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::store::LearningStore;
use crate::domain::{AccuracyMetric, MetricPeriod, Sport, VerifiedPrediction, ALL_METRIC_TYPES};
use crate::error::Result;

/// Rolls verified predictions up into accuracy metrics.
///
/// Window membership is decided by verification time, so only the window
/// containing "now" can gain rows. The store refuses to write a window its
/// own clock says is closed.
pub struct AccuracyAggregator {
    store: Arc<dyn LearningStore>,
}

impl AccuracyAggregator {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self { store }
    }

    /// Recompute the open window of `period` for a sport: one row per metric
    /// type plus the sport-wide `"all"` row. Returns the rows written.
    #[instrument(skip(self))]
    pub async fn recompute(
        &self,
        sport: Sport,
        period: MetricPeriod,
        now: DateTime<Utc>,
    ) -> Result<Vec<AccuracyMetric>> {
        let (start, end) = period.window_containing(now);
        let written = self
            .store
            .refresh_window(sport, period, start, end, now)
            .await?;

        debug!(
            "Recomputed {} {} metrics for {} in window starting {}",
            written.len(),
            period,
            sport,
            start
        );
        Ok(written)
    }

    /// Recompute every period's open window
    pub async fn recompute_all(&self, sport: Sport, now: DateTime<Utc>) -> Result<()> {
        for period in MetricPeriod::ALL {
            self.recompute(sport, period, now).await?;
        }
        Ok(())
    }
}

/// Group verifications by metric type and compute rates; windows with no
/// verifications yield no rows.
pub fn summarize(
    sport: Sport,
    period: MetricPeriod,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    verified: &[VerifiedPrediction],
    computed_at: DateTime<Utc>,
) -> Vec<AccuracyMetric> {
    if verified.is_empty() {
        return Vec::new();
    }

    let mut groups: BTreeMap<&str, Vec<&VerifiedPrediction>> = BTreeMap::new();
    for item in verified {
        groups
            .entry(item.prediction.metric_type.as_str())
            .or_default()
            .push(item);
    }

    let build = |metric_type: &str, items: &[&VerifiedPrediction]| {
        let total = items.len() as i64;
        let correct = items.iter().filter(|v| v.verification.is_accurate).count() as i64;
        let abs_error: f64 = items.iter().map(|v| v.verification.error.abs()).sum();

        AccuracyMetric {
            sport,
            metric_type: metric_type.to_string(),
            period,
            period_start,
            period_end,
            total_predictions: total,
            correct_predictions: correct,
            accuracy_rate: correct as f64 / total as f64 * 100.0,
            avg_error: abs_error / total as f64,
            computed_at,
        }
    };

    let mut metrics: Vec<AccuracyMetric> = groups
        .iter()
        .map(|(metric_type, items)| build(metric_type, items))
        .collect();

    let everything: Vec<&VerifiedPrediction> = verified.iter().collect();
    metrics.push(build(ALL_METRIC_TYPES, &everything));
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PredictionRecord, VerificationResult};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn verified(metric_type: &str, predicted: f64, actual: f64) -> VerifiedPrediction {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let prediction = PredictionRecord {
            id: Uuid::new_v4(),
            sport: Sport::Nfl,
            subject: "QB1".into(),
            team: None,
            opponent: "DAL".into(),
            scheduled_at: now,
            metric_type: metric_type.into(),
            predicted_value: predicted,
            confidence_score: None,
            model_version: "1.0".into(),
            feature_importance: None,
            created_at: now,
        };
        let verification = VerificationResult::evaluate(&prediction, actual, "test", 10.0, now);
        VerifiedPrediction {
            prediction,
            verification,
        }
    }

    #[test]
    fn test_summarize_groups_by_metric_type_and_rollup() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let (start, end) = MetricPeriod::Daily.window_containing(now);
        let items = vec![
            verified("passing_yards", 250.0, 260.0), // accurate, |err| 10
            verified("passing_yards", 250.0, 180.0), // miss, |err| 70
            verified("touchdowns", 2.0, 2.0),        // accurate, |err| 0
        ];

        let metrics = summarize(Sport::Nfl, MetricPeriod::Daily, start, end, &items, now);
        assert_eq!(metrics.len(), 3);

        let yards = metrics.iter().find(|m| m.metric_type == "passing_yards").unwrap();
        assert_eq!(yards.total_predictions, 2);
        assert_eq!(yards.correct_predictions, 1);
        assert!((yards.accuracy_rate - 50.0).abs() < 1e-9);
        assert!((yards.avg_error - 40.0).abs() < 1e-9);

        let all = metrics.iter().find(|m| m.metric_type == ALL_METRIC_TYPES).unwrap();
        assert_eq!(all.total_predictions, 3);
        assert_eq!(all.correct_predictions, 2);
        assert!((all.accuracy_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(all.period_start, start);
        assert_eq!(all.period_end, end);
    }

    #[test]
    fn test_summarize_empty_window_writes_nothing() {
        let now = Utc::now();
        let (start, end) = MetricPeriod::Weekly.window_containing(now);
        assert!(summarize(Sport::Nfl, MetricPeriod::Weekly, start, end, &[], now).is_empty());
    }
}
