//! Request authentication

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use motchi_api::ApiError;
use motchi_core::UserId;

use crate::state::AppState;

/// Bearer credential from a request's headers, if one is present
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Resolve the calling identity from a bearer access token
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

    crate::auth::validate_access_token(token, &state.jwt_decoding_key)
        .map(|claims| claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
}

/// Layer for routes that require a logged-in caller; the resolved
/// [`UserId`] lands in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    request.extensions_mut().insert(user_id);

    Ok(next.run(request).await)
}
