//! Authentication handlers

use axum::extract::{Json, State};
use motchi_api::{
    ApiError,
    requests::AuthRequest,
    responses::{AuthResponse, UserResponse},
};
use motchi_core::{CoreError, User};

use crate::{
    auth::{generate_access_token, generate_refresh_token, verify_password},
    state::AppState,
};

/// Handle login requests
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    match request {
        AuthRequest::Password { username, password } => {
            // An unknown username reads the same as a wrong password
            let user = match state.store.user_by_username(&username).await {
                Ok(user) => user,
                Err(CoreError::UserNotFound) => {
                    return Err(ApiError::unauthorized("Invalid username or password"));
                }
                Err(e) => return Err(e.into()),
            };

            let verified = verify_password(&password, &user.password_hash)
                .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;
            if !verified {
                return Err(ApiError::unauthorized("Invalid username or password"));
            }

            let token_family = uuid::Uuid::new_v4();
            issue_tokens(&state, user, token_family)
        }
        AuthRequest::RefreshToken { refresh_token } => {
            refresh_from_token(&state, &refresh_token).await
        }
    }
}

/// Handle token refresh requests: refresh token in the Authorization header
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = crate::middleware::bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    refresh_from_token(&state, token).await
}

async fn refresh_from_token(
    state: &AppState,
    token: &str,
) -> Result<Json<AuthResponse>, ApiError> {
    let claims = crate::auth::validate_refresh_token(token, &state.jwt_decoding_key)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = state.store.user_by_id(claims.sub).await?;

    // New pair in the same rotation family
    issue_tokens(state, user, claims.family)
}

fn issue_tokens(
    state: &AppState,
    user: User,
    family: uuid::Uuid,
) -> Result<Json<AuthResponse>, ApiError> {
    let access_token = generate_access_token(
        user.id,
        &state.jwt_encoding_key,
        state.config.access_token_ttl,
    )
    .map_err(internal)?;

    let refresh_token = generate_refresh_token(
        user.id,
        family,
        &state.jwt_encoding_key,
        state.config.refresh_token_ttl,
    )
    .map_err(internal)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.access_token_ttl,
        user: UserResponse {
            id: user.id,
            username: user.username,
            pet_id: user.pet_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        },
    }))
}

fn internal(e: crate::error::ServerError) -> ApiError {
    tracing::error!(error = %e, "token generation failed");
    ApiError::Core {
        message: "Failed to generate tokens".to_string(),
        json: String::new(),
    }
}
