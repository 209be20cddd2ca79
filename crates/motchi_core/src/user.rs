//! User account records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PetId, UserId};

/// A user account.
///
/// `pet_id` is set when the user creates a pet as its main owner; a user
/// who is only a co-owner has `pet_id = None` and is found through the
/// pet's `owner2` column instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub pet_id: Option<PetId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            username: username.into(),
            password_hash: password_hash.into(),
            pet_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
