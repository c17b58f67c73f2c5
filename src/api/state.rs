use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::engine::AntiRecencyEngine;
use crate::learning::ContinuousLearning;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Stateless projection engine
    pub engine: Arc<AntiRecencyEngine>,

    /// Feedback loop over the configured store
    pub learning: Arc<ContinuousLearning>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<AntiRecencyEngine>, learning: Arc<ContinuousLearning>) -> Self {
        Self {
            engine,
            learning,
            start_time: Utc::now(),
        }
    }
}
