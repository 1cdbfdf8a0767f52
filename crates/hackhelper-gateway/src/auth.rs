//! Shared bearer-token gate for the `/api` routes

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;
use crate::server::AppState;

/// Validate a bearer token against the configured token.
///
/// Returns `true` if no token is configured (auth disabled) or the provided
/// token matches.
pub fn validate_token(configured_token: &str, provided_token: &str) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    if provided_token.is_empty() {
        return false;
    }
    constant_time_eq(configured_token.as_bytes(), provided_token.as_bytes())
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Whether a request's headers satisfy the configured token
pub fn check_auth(configured_token: &str, headers: &HeaderMap) -> bool {
    if configured_token.is_empty() {
        return true;
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .is_some_and(|t| validate_token(configured_token, t))
}

/// Middleware rejecting requests without a valid token
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !check_auth(&state.auth_token, request.headers()) {
        warn!("Rejected unauthenticated request to {}", request.uri().path());
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// Constant-time byte comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
