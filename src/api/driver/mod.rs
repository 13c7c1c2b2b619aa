//! Driver mobile API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/driver/login | POST | none |
//! | /api/driver/runs | GET | bearer |
//! | /api/driver/runs/{run_id}/stops | GET | bearer |
//! | /api/driver/stops/{stop_id}/update | POST | bearer |
//! | /api/driver/profile | GET | bearer |
//! | /api/driver/location | POST | bearer |
//! | /api/driver/logout | POST | bearer |

pub mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/driver/login", post(handler::login))
        .route("/api/driver/runs", get(handler::runs))
        .route("/api/driver/runs/{run_id}/stops", get(handler::run_stops))
        .route("/api/driver/stops/{stop_id}/update", post(handler::update_stop))
        .route("/api/driver/profile", get(handler::profile))
        .route("/api/driver/location", post(handler::update_location))
        .route("/api/driver/logout", post(handler::logout))
}
