//! HTTP server bootstrap

use tokio::net::TcpListener;

use crate::api;
use crate::core::error::{AppError, Result};
use crate::core::state::ServerState;

/// Bind the driver API and serve until ctrl-c.
pub async fn run(state: ServerState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Driver API listening on {addr}");

    let app = api::build_app(state.clone()).with_state(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}
