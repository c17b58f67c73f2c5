use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::engine::AntiRecencyEngine;
use crate::error::Result;
use crate::learning::ContinuousLearning;

/// Start the API server
pub async fn start_api_server(
    engine: Arc<AntiRecencyEngine>,
    learning: Arc<ContinuousLearning>,
    port: u16,
) -> Result<()> {
    let app = create_router(AppState::new(engine, learning));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
