use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::WeightingConfig;
use crate::domain::{AccuracyMetric, MetricPeriod, RetrainingTrigger, Sport, WeightedProjection};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

// ============================================================================
// Workflow Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodologyResponse {
    pub name: String,
    pub description: String,
    pub weights: WeightingConfig,
    pub remainder_weight: f64,
    pub recent_window: usize,
    pub trend_window: usize,
    pub outlier_threshold: f64,
    pub edge_threshold: f64,
    pub confidence_rules: Vec<String>,
}

/// Items are kept as raw JSON so one malformed prop fails alone
#[derive(Debug, Clone, Deserialize)]
pub struct BatchAnalysisRequest {
    pub props: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemResult {
    Ok(Box<WeightedProjection>),
    Error(ErrorBody),
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(flatten)]
    pub result: BatchItemResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAnalysisResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

// ============================================================================
// Learning Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPredictionResponse {
    pub prediction_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub actual_value: f64,
    pub source: String,
}

pub const DEFAULT_DAYS_BACK: i64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsQuery {
    pub period: Option<String>,
    pub days_back: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub days_back: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub sport: Sport,
    pub period: MetricPeriod,
    pub days_back: i64,
    pub metrics: Vec<AccuracyMetric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSummaryResponse {
    pub sport: Sport,
    pub days_back: i64,
    pub retraining_events: i64,
    pub learning_events: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub sport: Sport,
    pub retraining_trigger: Option<RetrainingTrigger>,
}
