//! API request types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Authentication request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum AuthRequest {
    /// Login with username/password
    Password { username: String, password: String },
    /// Refresh access token
    RefreshToken { refresh_token: String },
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

/// Co-owner addition request. The pet is always the caller's own; only the
/// second owner is named, by username.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddCoOwnerRequest {
    pub username: String,
}
