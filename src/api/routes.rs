use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Workflow endpoints
        .route("/api/v1/workflow/health", get(handlers::health))
        .route("/api/v1/workflow/methodology", get(handlers::methodology))
        .route("/api/v1/workflow/analyze-prop", post(handlers::analyze_prop))
        .route("/api/v1/workflow/batch-analysis", post(handlers::batch_analysis))
        // Learning endpoints
        .route("/api/v1/learning/predictions", post(handlers::log_prediction))
        .route(
            "/api/v1/learning/predictions/:id/verify",
            post(handlers::verify_prediction),
        )
        .route("/api/v1/learning/metrics/:sport", get(handlers::get_metrics))
        .route("/api/v1/learning/summary/:sport", get(handlers::get_summary))
        .route("/api/v1/learning/refresh/:sport", post(handlers::refresh_sport))
        // Add state and CORS
        .with_state(state)
        .layer(cors)
}
