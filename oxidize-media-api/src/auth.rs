//! Shared-secret gate for `/api` routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Prefix of every gated path.
pub const PROTECTED_PREFIX: &str = "/api";

fn is_protected(path: &str) -> bool {
    path == PROTECTED_PREFIX || path.starts_with("/api/")
}

/// Reject `/api` requests whose `x-api-key` does not match before the body
/// is touched. With no key configured nothing under `/api` gets through.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_protected(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match (state.api_key(), presented) {
        (Some(expected), Some(presented)) if expected == presented => Ok(next.run(request).await),
        _ => {
            debug!(path = %request.uri().path(), "Rejected request without a valid API key");
            Err(AppError::Unauthorized)
        }
    }
}
