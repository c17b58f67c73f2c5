use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::{state::AppState, types::*};
use crate::domain::{MetricPeriod, NewPrediction, Sport};
use crate::error::Result;
use crate::learning::VerificationOutcome;

/// POST /api/v1/learning/predictions
pub async fn log_prediction(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewPrediction>, JsonRejection>,
) -> Result<(StatusCode, Json<LogPredictionResponse>)> {
    let Json(prediction) = payload?;
    let prediction_id = state.learning.log_prediction(prediction).await?;
    Ok((StatusCode::CREATED, Json(LogPredictionResponse { prediction_id })))
}

/// POST /api/v1/learning/predictions/:id/verify
pub async fn verify_prediction(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationOutcome>> {
    let Path(prediction_id) = id?;
    let Json(request) = payload?;

    let outcome = state
        .learning
        .verify_result(prediction_id, request.actual_value, &request.source)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/learning/metrics/:sport?period=daily&days_back=30
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(sport): Path<String>,
    query: std::result::Result<Query<MetricsQuery>, QueryRejection>,
) -> Result<Json<MetricsResponse>> {
    let sport: Sport = sport.parse()?;
    let Query(query) = query?;
    let period = match query.period.as_deref() {
        Some(raw) => raw.parse::<MetricPeriod>()?,
        None => MetricPeriod::Daily,
    };
    let days_back = query.days_back.unwrap_or(DEFAULT_DAYS_BACK);

    let metrics = state
        .learning
        .get_accuracy_metrics(sport, period, days_back)
        .await?;

    Ok(Json(MetricsResponse {
        sport,
        period,
        days_back,
        metrics,
    }))
}

/// GET /api/v1/learning/summary/:sport?days_back=30
pub async fn get_summary(
    State(state): State<AppState>,
    Path(sport): Path<String>,
    query: std::result::Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<LearningSummaryResponse>> {
    let sport: Sport = sport.parse()?;
    let Query(query) = query?;
    let days_back = query.days_back.unwrap_or(DEFAULT_DAYS_BACK);

    let summary = state.learning.get_learning_summary(sport, days_back).await?;

    Ok(Json(LearningSummaryResponse {
        sport,
        days_back,
        retraining_events: summary.retraining_events,
        learning_events: summary.learning_events,
    }))
}

/// POST /api/v1/learning/refresh/:sport
pub async fn refresh_sport(
    State(state): State<AppState>,
    Path(sport): Path<String>,
) -> Result<Json<RefreshResponse>> {
    let sport: Sport = sport.parse()?;
    let retraining_trigger = state.learning.refresh_sport(sport).await?;
    Ok(Json(RefreshResponse {
        sport,
        retraining_trigger,
    }))
}
