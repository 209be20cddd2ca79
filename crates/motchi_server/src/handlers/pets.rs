//! Pet management

use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
};
use motchi_api::{ApiError, requests::AddCoOwnerRequest, responses::PetResponse};
use motchi_core::UserId;

use crate::state::AppState;

/// Create the caller's pet
pub async fn create_pet(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> Result<(StatusCode, Json<PetResponse>), ApiError> {
    let pet = state.store.create_pet(user_id).await?;

    tracing::info!(user_id = %user_id, pet_id = %pet.id, "pet created");

    Ok((StatusCode::CREATED, Json(pet.into())))
}

/// Grant a second user joint ownership of the caller's pet
pub async fn add_co_owner(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<AddCoOwnerRequest>,
) -> Result<Json<PetResponse>, ApiError> {
    let pet = state.store.add_co_owner(user_id, &request.username).await?;

    tracing::info!(
        user_id = %user_id,
        pet_id = %pet.id,
        co_owner = %request.username,
        "co-owner added"
    );

    Ok(Json(pet.into()))
}
