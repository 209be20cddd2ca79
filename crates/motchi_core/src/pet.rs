//! The jointly-owned pet entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PetId, UserId};

/// A pet jointly owned by up to two users.
///
/// `money` never goes below zero; that invariant is enforced at the single
/// point of mutation ([`crate::store::PetStore::spend`]), never by trusting
/// the client. `owner2` transitions once from `None` to `Some` and is never
/// reassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub main_owner: UserId,
    pub owner2: Option<UserId>,
    pub money: i64,
    pub health: u8,
    pub hunger: u8,
    pub happiness: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    /// A freshly created pet: empty wallet, full gauges
    pub fn new(main_owner: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: PetId::generate(),
            main_owner,
            owner2: None,
            money: 0,
            health: 100,
            hunger: 100,
            happiness: 100,
            created_at: now,
            updated_at: now,
        }
    }

    /// The other owner relative to `user`, if any.
    ///
    /// Returns `None` both when `user` is the sole owner and when `user`
    /// does not own this pet at all.
    pub fn other_owner(&self, user: UserId) -> Option<UserId> {
        if self.main_owner == user {
            self.owner2
        } else if self.owner2 == Some(user) {
            Some(self.main_owner)
        } else {
            None
        }
    }

    /// Whether `user` is one of this pet's owners
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.main_owner == user || self.owner2 == Some(user)
    }
}
