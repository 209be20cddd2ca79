//! Motchi API types and definitions
//!
//! Request/response types for the HTTP surface and the WebSocket message
//! enums the synchronization hub speaks, shared between server and client
//! implementations.

pub mod error;
pub mod events;
pub mod requests;
pub mod responses;

pub use error::ApiError;

// Re-export common types from motchi-core
pub use motchi_core::id::{PetId, UserId};

/// API version constant
pub const API_VERSION: &str = "v1";

/// Claims carried in an access token
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    /// The authenticated user
    pub sub: UserId,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Token id
    pub jti: uuid::Uuid,
    pub token_type: String,
}

/// Claims carried in a refresh token
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
    pub jti: uuid::Uuid,
    pub token_type: String,
    /// Rotation family; all tokens refreshed from one login share it
    pub family: uuid::Uuid,
}
