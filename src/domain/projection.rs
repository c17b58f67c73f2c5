use serde::{Deserialize, Serialize};

use crate::error::{PropsightError, Result};

/// Season-long summary of a value series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStatistics {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1); 0 when n = 1
    pub std_dev: f64,
    /// 10th percentile
    pub floor: f64,
    /// 90th percentile
    pub ceiling: f64,
    pub sample_size: usize,
}

/// Discrete trust judgment attached to a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Insufficient,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Insufficient => "INSUFFICIENT",
            ConfidenceLevel::Low => "LOW",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side of the line to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Over,
    Under,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Over => "OVER",
            Recommendation::Under => "UNDER",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights that actually moved the final projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsApplied {
    pub baseline: f64,
    pub recent: f64,
    pub trend: f64,
    /// Unallocated weight, applied to the baseline mean
    pub remainder: f64,
}

impl WeightsApplied {
    pub fn total(&self) -> f64 {
        self.baseline + self.recent + self.trend + self.remainder
    }
}

/// Final weighted projection for one prop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedProjection {
    pub subject_id: String,
    pub metric_type: String,
    pub line: f64,
    pub season_baseline: f64,
    pub final_projection: f64,
    pub edge_percent: f64,
    pub confidence_level: ConfidenceLevel,
    pub recommendation: Option<Recommendation>,
    pub floor: f64,
    pub ceiling: f64,
    pub weights_applied: WeightsApplied,
    pub opponent_tier: u8,
    /// Recent form after outlier regression
    pub recent_form: f64,
    pub trend: f64,
    pub is_outlier: bool,
}

pub const DEFAULT_OPPONENT_TIER: u8 = 3;

fn default_opponent_tier() -> u8 {
    DEFAULT_OPPONENT_TIER
}

/// Input for a single prop analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzePropRequest {
    pub subject_id: String,
    pub metric_type: String,
    pub line: f64,
    /// Historical values, most recent last
    pub values: Vec<f64>,
    /// Opponent defensive tier, 1 (best) to 5 (worst)
    #[serde(default = "default_opponent_tier")]
    pub opponent_tier: u8,
}

impl AnalyzePropRequest {
    pub fn new(
        subject_id: impl Into<String>,
        metric_type: impl Into<String>,
        line: f64,
        values: Vec<f64>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            metric_type: metric_type.into(),
            line,
            values,
            opponent_tier: DEFAULT_OPPONENT_TIER,
        }
    }

    pub fn with_opponent_tier(mut self, tier: u8) -> Self {
        self.opponent_tier = tier;
        self
    }

    /// Field-level checks; an empty series is left to the engine, which
    /// reports it as insufficient data.
    pub fn validate(&self) -> Result<()> {
        if self.subject_id.trim().is_empty() {
            return Err(PropsightError::Validation("subject_id must not be empty".into()));
        }
        if self.metric_type.trim().is_empty() {
            return Err(PropsightError::Validation("metric_type must not be empty".into()));
        }
        if !self.line.is_finite() {
            return Err(PropsightError::Validation("line must be a finite number".into()));
        }
        if let Some(pos) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(PropsightError::Validation(format!(
                "values[{pos}] is not a finite number"
            )));
        }
        if !(1..=5).contains(&self.opponent_tier) {
            return Err(PropsightError::Validation(format!(
                "opponent_tier must be between 1 and 5, got {}",
                self.opponent_tier
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_opponent_tier() {
        let req: AnalyzePropRequest = serde_json::from_str(
            r#"{"subject_id":"p1","metric_type":"points","line":20.5,"values":[1,2,3]}"#,
        )
        .unwrap();
        assert_eq!(req.opponent_tier, DEFAULT_OPPONENT_TIER);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn request_rejects_bad_fields() {
        let base = AnalyzePropRequest::new("p1", "points", 20.5, vec![1.0, 2.0]);

        assert!(base.clone().with_opponent_tier(0).validate().is_err());
        assert!(base.clone().with_opponent_tier(6).validate().is_err());

        let mut nan_line = base.clone();
        nan_line.line = f64::NAN;
        assert!(nan_line.validate().is_err());

        let mut bad_value = base.clone();
        bad_value.values.push(f64::INFINITY);
        assert!(bad_value.validate().is_err());

        let mut blank = base;
        blank.subject_id = "  ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn confidence_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::Insufficient).unwrap(),
            "\"INSUFFICIENT\""
        );
        assert_eq!(
            serde_json::to_string(&Some(Recommendation::Over)).unwrap(),
            "\"OVER\""
        );
        assert!(ConfidenceLevel::High > ConfidenceLevel::Medium);
    }
}
