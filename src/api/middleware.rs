//! Driver authentication middleware

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::core::{AppError, ServerState};

/// Identity injected into request extensions by [`require_driver_auth`].
#[derive(Debug, Clone)]
pub struct CurrentDriver {
    pub driver_id: String,
    pub phone: String,
}

/// Validate the bearer token on every driver route except login. The
/// 401 is identical for missing, unknown, and expired tokens.
pub async fn require_driver_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS preflight never carries credentials
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if !path.starts_with("/api/driver/") || path == "/api/driver/login" {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or(AppError::Unauthorized)?;
    let identity = state
        .tokens
        .validate_driver_token(token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(CurrentDriver {
        driver_id: identity.driver_id,
        phone: identity.phone,
    });
    Ok(next.run(req).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc123"),
        );
        assert!(bearer_token(&headers).is_none());
    }
}
