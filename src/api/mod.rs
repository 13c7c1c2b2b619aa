//! HTTP API
//!
//! Driver-facing routes plus a public health check. Authentication is a
//! router-level middleware that validates the bearer token and injects
//! the [`middleware::CurrentDriver`] extension.

pub mod driver;
pub mod health;
pub mod middleware;

use axum::Router;
use axum::middleware as axum_middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// All routes, no middleware, no state.
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(driver::router())
        .merge(health::router())
}

/// Fully configured application: routes plus CORS, tracing, and driver
/// authentication. Used by the HTTP server and by router tests.
pub fn build_app(state: ServerState) -> Router<ServerState> {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // runs before routes, injects CurrentDriver
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_driver_auth,
        ))
}
