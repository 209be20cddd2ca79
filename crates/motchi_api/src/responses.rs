//! API response types

use motchi_core::{Pet, PetId, UserId};
use serde::{Deserialize, Serialize};

/// Authentication response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Access token for API requests and the WebSocket handshake
    pub access_token: String,
    /// Refresh token for getting new access tokens
    pub refresh_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiration time in seconds
    pub expires_in: u64,
    /// User information
    pub user: UserResponse,
}

/// User response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub pet_id: Option<PetId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Pet response for the management endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetResponse {
    pub id: PetId,
    pub main_owner: UserId,
    pub owner2: Option<UserId>,
    pub money: i64,
    pub health: u8,
    pub hunger: u8,
    pub happiness: u8,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Pet> for PetResponse {
    fn from(pet: Pet) -> Self {
        Self {
            id: pet.id,
            main_owner: pet.main_owner,
            owner2: pet.owner2,
            money: pet.money,
            health: pet.health,
            hunger: pet.hunger,
            happiness: pet.happiness,
            created_at: pet.created_at,
            updated_at: pet.updated_at,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    /// Number of currently registered live connections
    pub connections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}
