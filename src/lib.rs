pub mod adapters;
#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod learning;

pub use adapters::{InMemoryStore, PostgresStore};
pub use config::AppConfig;
pub use domain::{
    AccuracyMetric, AnalyzePropRequest, ConfidenceLevel, LearningSummary, MetricPeriod,
    NewPrediction, PredictionRecord, Recommendation, RetrainingTrigger, Sport,
    VerificationResult, WeightedProjection,
};
pub use engine::AntiRecencyEngine;
pub use error::{PropsightError, Result};
pub use learning::{ContinuousLearning, LearningStore, VerificationOutcome};
