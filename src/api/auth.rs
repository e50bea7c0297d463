//! Bearer token check for the admin generator routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use log::warn;

use super::{ApiError, AppState};

/// Reject requests whose `Authorization: Bearer` token does not match the
/// configured admin token. With no token configured every request fails.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state
        .config
        .server
        .admin_token
        .as_deref()
        .filter(|token| !token.is_empty())
    else {
        warn!("Admin route {} called but no admin token is configured", request.uri());
        return Err(ApiError::Unauthorized(
            "Admin access is not configured".to_string(),
        ));
    };

    let token_matches = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim() == expected);

    match token_matches {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            warn!("Rejected admin request to {}: invalid token", request.uri());
            Err(ApiError::Unauthorized("Invalid admin token".to_string()))
        }
        None => Err(ApiError::Unauthorized("Missing bearer token".to_string())),
    }
}
