//! Admin authentication middleware
//!
//! Validates the shared admin token on administrative routes. The engine
//! itself performs no authorization; this is the boundary where the caller
//! proves it. Platform-role checks belong to the chat layer and stay out of
//! this service.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::AppState;

/// Header carrying the shared admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin middleware comparing the request token against the configured one.
///
/// # Response Codes
/// - 401 Unauthorized: missing or wrong token, or no token configured
///   (admin surface disabled)
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.admin_token.as_deref() else {
        tracing::warn!("Admin request received but no admin token is configured");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if provided != expected {
        tracing::warn!("Rejected admin request with a bad token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
