//! Account creation

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use motchi_api::{ApiError, requests::CreateUserRequest, responses::UserResponse};

use crate::{auth::hash_password, state::AppState};

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if request.username.trim().is_empty() {
        return Err(ApiError::validation("Username must not be empty"));
    }
    if request.password.is_empty() {
        return Err(ApiError::validation("Password must not be empty"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|_| ApiError::validation("Invalid password"))?;

    let user = state
        .store
        .create_user(&request.username, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            pet_id: user.pet_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }),
    ))
}
