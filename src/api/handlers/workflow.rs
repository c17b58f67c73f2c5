use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;

use crate::api::{state::AppState, types::*};
use crate::domain::{AnalyzePropRequest, WeightedProjection};
use crate::error::{PropsightError, Result};

/// GET /api/v1/workflow/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (now - state.start_time).num_seconds(),
        timestamp: now,
    })
}

/// GET /api/v1/workflow/methodology
pub async fn methodology(State(state): State<AppState>) -> Json<MethodologyResponse> {
    let config = state.engine.config();
    Json(MethodologyResponse {
        name: "Anti-Recency Engine".to_string(),
        description: "Full-season baseline anchors the projection; recent form is \
                      regressed to the baseline when it is a statistical outlier."
            .to_string(),
        weights: config.weights.clone(),
        remainder_weight: config.weights.remainder(),
        recent_window: config.recent_window,
        trend_window: config.trend_window,
        outlier_threshold: config.outlier_threshold,
        edge_threshold: config.edge_threshold,
        confidence_rules: vec![
            format!(
                "INSUFFICIENT when fewer than {} values",
                config.min_sample_size
            ),
            format!(
                "LOW when |edge| < {}% or recent form is an outlier",
                config.low_edge_threshold
            ),
            format!(
                "HIGH when at least {} values and |edge| > {}%",
                config.high_confidence_sample_size, config.high_edge_threshold
            ),
            "MEDIUM otherwise".to_string(),
        ],
    })
}

/// POST /api/v1/workflow/analyze-prop
pub async fn analyze_prop(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzePropRequest>, JsonRejection>,
) -> Result<Json<WeightedProjection>> {
    let Json(request) = payload?;
    let projection = state.engine.analyze(&request)?;
    Ok(Json(projection))
}

/// POST /api/v1/workflow/batch-analysis
pub async fn batch_analysis(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchAnalysisRequest>, JsonRejection>,
) -> Result<Json<BatchAnalysisResponse>> {
    let Json(request) = payload?;

    let parsed: Vec<Result<AnalyzePropRequest>> = request
        .props
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_value::<AnalyzePropRequest>(raw)
                .map_err(|e| PropsightError::Validation(format!("props[{index}]: {e}")))
        })
        .collect();

    let well_formed: Vec<AnalyzePropRequest> = parsed
        .iter()
        .filter_map(|item| item.as_ref().ok().cloned())
        .collect();
    let mut analyzed = state.engine.analyze_props_batch(&well_formed).into_iter();

    let results: Vec<BatchItem> = parsed
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let outcome = item.and_then(|_| {
                analyzed.next().unwrap_or_else(|| {
                    Err(PropsightError::Internal(format!(
                        "missing batch result for props[{index}]"
                    )))
                })
            });

            let result = match outcome {
                Ok(projection) => BatchItemResult::Ok(Box::new(projection)),
                Err(e) => BatchItemResult::Error(ErrorBody::from(&e)),
            };
            BatchItem { index, result }
        })
        .collect();

    let succeeded = results
        .iter()
        .filter(|item| matches!(item.result, BatchItemResult::Ok(_)))
        .count();

    Ok(Json(BatchAnalysisResponse {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        results,
    }))
}
