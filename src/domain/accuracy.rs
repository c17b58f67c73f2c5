use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::Sport;
use crate::error::{PropsightError, Result};

/// Metric type of the sport-wide rollup row
pub const ALL_METRIC_TYPES: &str = "all";

/// Aggregation window for accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl MetricPeriod {
    pub const ALL: [MetricPeriod; 3] = [MetricPeriod::Daily, MetricPeriod::Weekly, MetricPeriod::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricPeriod::Daily => "daily",
            MetricPeriod::Weekly => "weekly",
            MetricPeriod::Monthly => "monthly",
        }
    }

    /// Half-open UTC window `[start, end)` containing `at`.
    /// Weeks start on Monday.
    pub fn window_containing(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = at.date_naive();
        match self {
            MetricPeriod::Daily => {
                let start = midnight(date);
                (start, start + Duration::days(1))
            }
            MetricPeriod::Weekly => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                let start = midnight(monday);
                (start, start + Duration::days(7))
            }
            MetricPeriod::Monthly => {
                let first = date.with_day(1).unwrap_or(date);
                let next = first
                    .checked_add_months(Months::new(1))
                    .unwrap_or(NaiveDate::MAX);
                (midnight(first), midnight(next))
            }
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl std::fmt::Display for MetricPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricPeriod {
    type Err = PropsightError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(MetricPeriod::Daily),
            "weekly" | "week" => Ok(MetricPeriod::Weekly),
            "monthly" | "month" => Ok(MetricPeriod::Monthly),
            other => Err(PropsightError::Validation(format!(
                "unknown period '{other}'; expected daily|weekly|monthly"
            ))),
        }
    }
}

/// Rolled-up accuracy for one (sport, metric type, period window)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetric {
    pub sport: Sport,
    pub metric_type: String,
    pub period: MetricPeriod,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_predictions: i64,
    pub correct_predictions: i64,
    /// correct / total × 100
    pub accuracy_rate: f64,
    /// Mean absolute error
    pub avg_error: f64,
    pub computed_at: DateTime<Utc>,
}

impl AccuracyMetric {
    /// Whether the window is still open at `at`
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.period_end > at
    }
}

/// Retraining trigger about to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRetrainingTrigger {
    pub sport: Sport,
    pub reason: String,
    pub accuracy_at_trigger: f64,
    /// Start of the daily window whose accuracy caused the trigger
    pub period_start: DateTime<Utc>,
    pub triggered_at: DateTime<Utc>,
}

/// Append-only retraining trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainingTrigger {
    pub id: i64,
    pub sport: Sport,
    pub reason: String,
    pub accuracy_at_trigger: f64,
    pub period_start: DateTime<Utc>,
    pub triggered_at: DateTime<Utc>,
}

impl RetrainingTrigger {
    pub fn from_new(id: i64, new: NewRetrainingTrigger) -> Self {
        Self {
            id,
            sport: new.sport,
            reason: new.reason,
            accuracy_at_trigger: new.accuracy_at_trigger,
            period_start: new.period_start,
            triggered_at: new.triggered_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningEventType {
    PredictionMade,
    ResultVerified,
    RetrainTriggered,
}

impl LearningEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningEventType::PredictionMade => "prediction_made",
            LearningEventType::ResultVerified => "result_verified",
            LearningEventType::RetrainTriggered => "retrain_triggered",
        }
    }
}

impl std::fmt::Display for LearningEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LearningEventType {
    type Err = PropsightError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "prediction_made" => Ok(LearningEventType::PredictionMade),
            "result_verified" => Ok(LearningEventType::ResultVerified),
            "retrain_triggered" => Ok(LearningEventType::RetrainTriggered),
            other => Err(PropsightError::Validation(format!(
                "unknown learning event type '{other}'"
            ))),
        }
    }
}

/// Typed details of a learning event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LearningEventDetails {
    PredictionMade {
        prediction_id: Uuid,
        subject: String,
        metric_type: String,
    },
    ResultVerified {
        prediction_id: Uuid,
        is_accurate: bool,
    },
    RetrainTriggered {
        trigger_id: i64,
        accuracy: f64,
    },
}

impl LearningEventDetails {
    pub fn event_type(&self) -> LearningEventType {
        match self {
            LearningEventDetails::PredictionMade { .. } => LearningEventType::PredictionMade,
            LearningEventDetails::ResultVerified { .. } => LearningEventType::ResultVerified,
            LearningEventDetails::RetrainTriggered { .. } => LearningEventType::RetrainTriggered,
        }
    }
}

/// Audit-trail entry; written for observability, never read for control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub sport: Sport,
    pub event_type: LearningEventType,
    pub details: LearningEventDetails,
    pub timestamp: DateTime<Utc>,
}

impl LearningEvent {
    pub fn new(sport: Sport, details: LearningEventDetails, timestamp: DateTime<Utc>) -> Self {
        Self {
            sport,
            event_type: details.event_type(),
            details,
            timestamp,
        }
    }
}

/// Counts of learning activity over a look-back window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningSummary {
    pub retraining_events: i64,
    pub learning_events: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_window() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 17, 45, 3).unwrap();
        let (start, end) = MetricPeriod::Daily.window_containing(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_weekly_window_starts_monday() {
        // 2026-10-16 is a Friday
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let (start, end) = MetricPeriod::Weekly.window_containing(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_monthly_window_crosses_year() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = MetricPeriod::Monthly.window_containing(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_event_details_carry_their_type() {
        let event = LearningEvent::new(
            Sport::Nhl,
            LearningEventDetails::RetrainTriggered {
                trigger_id: 7,
                accuracy: 64.0,
            },
            Utc::now(),
        );
        assert_eq!(event.event_type, LearningEventType::RetrainTriggered);

        let json = serde_json::to_value(&event.details).unwrap();
        assert_eq!(json["trigger_id"], 7);
        assert_eq!(
            "result_verified".parse::<LearningEventType>().unwrap(),
            LearningEventType::ResultVerified
        );
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("Weekly".parse::<MetricPeriod>().unwrap(), MetricPeriod::Weekly);
        assert!("hourly".parse::<MetricPeriod>().is_err());
    }
}
