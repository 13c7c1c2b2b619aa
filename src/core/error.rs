//! Unified error handling
//!
//! [`AppError`] covers everything a handler or service can surface to a
//! caller. Expected WMS gateway failures are NOT errors — they travel as
//! [`crate::wms::WmsOutcome`] values and never reach this type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid, expired, missing, or revoked bearer token (401).
    ///
    /// Deliberately carries no detail: the response must not reveal
    /// whether a token existed versus was merely expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed required field (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Id-space exhaustion or duplicate resource (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Durable store unreachable or corrupt (500, fatal)
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else that should never happen (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid or expired token".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Result alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
