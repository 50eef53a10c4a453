//! Bearer token filter.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{AuthProvider, BEARER_TOKEN_PREFIX};

use crate::state::AppState;

/// Authenticated caller, taken from access token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    /// Token subject
    pub email: String,
    pub provider: AuthProvider,
}

/// Decode the access token and attach [`CurrentUser`] to the request.
///
/// Missing, malformed, foreign and expired tokens are all rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&request)?;

    let claims = state.auth_service.verify_access_token(&token).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        e
    })?;

    request.extensions_mut().insert(CurrentUser {
        id: claims.user_id,
        email: claims.sub,
        provider: claims.provider,
    });

    Ok(next.run(request).await)
}

fn extract_token(request: &Request<Body>) -> AppResult<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}
