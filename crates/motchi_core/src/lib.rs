//! Motchi core: domain types, storage and collaborator contracts
//!
//! This crate holds everything the synchronization hub depends on but does
//! not own: typed IDs, the [`Pet`](pet::Pet) entity and its non-negative
//! balance invariant, the [`PetStore`](store::PetStore) storage seam with
//! its SurrealDB implementation, and the opaque
//! [`IdentityResolver`](identity::IdentityResolver) authentication seam.

pub mod db;
pub mod error;
pub mod id;
pub mod identity;
pub mod pet;
pub mod store;
pub mod user;

pub use error::{CoreError, Result};
pub use id::{PetId, UserId};
pub use identity::IdentityResolver;
pub use pet::Pet;
pub use store::{PetHandle, PetStore, SpendOutcome};
pub use user::User;
