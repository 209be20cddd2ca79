//! Storage contract consumed by the synchronization hub
//!
//! The hub never takes a pet id from the wire; every request is resolved
//! server-side through [`PetStore::pet_for`], and every balance change goes
//! through [`PetStore::spend`], the single point where the non-negative
//! invariant is enforced.

use async_trait::async_trait;

use crate::{
    error::Result,
    id::{PetId, UserId},
    pet::Pet,
};

/// The pet a request acts on, resolved from the caller's identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetHandle {
    pub pet_id: PetId,
    /// The co-owner on the other side of the pet, if one is set
    pub other_owner: Option<UserId>,
}

/// Result of an invariant-checked balance update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendOutcome {
    /// The delta was applied; `new_money` is the authoritative balance
    Applied { new_money: i64 },
    /// The delta would drive the balance negative; nothing was applied
    InsufficientFunds { money: i64 },
}

/// Read/compare-and-write operations the hub needs from persistent storage.
///
/// Implementations serialize concurrent [`spend`](PetStore::spend) calls per
/// pet; the hub must not read-modify-write balances outside this contract.
#[async_trait]
pub trait PetStore: Send + Sync {
    /// Derive which pet a request from `user` applies to.
    ///
    /// Resolution is two-step: the user's own `pet_id` first, then "is this
    /// user the co-owner of some pet". An identity matching both steps with
    /// different pets is malformed data and yields
    /// [`CoreError::AmbiguousOwnership`](crate::error::CoreError); a user
    /// matching neither yields [`CoreError::NoPet`](crate::error::CoreError).
    async fn pet_for(&self, user: UserId) -> Result<PetHandle>;

    /// Atomically apply `money -= amount` iff the result stays non-negative.
    ///
    /// A negative `amount` is a deposit and always applies. Concurrent calls
    /// against the same pet are strictly serialized: under any interleaving
    /// the stored balance never goes negative and no delta is double-applied.
    async fn spend(&self, pet: PetId, amount: i64) -> Result<SpendOutcome>;

    /// Read-only snapshot of a pet
    async fn snapshot(&self, pet: PetId) -> Result<Pet>;
}
