//! Health check endpoint

use axum::{Json, extract::State};
use motchi_api::responses::{HealthResponse, HealthStatus};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: motchi_api::API_VERSION.to_string(),
        connections: state.registry.len(),
    })
}
