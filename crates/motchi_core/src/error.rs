use crate::{
    db::DatabaseError,
    id::{PetId, UserId},
};
use miette::Diagnostic;
use thiserror::Error;

/// Error taxonomy for the co-ownership hub.
///
/// Only `Unauthorized` is terminal for a connection attempt; every other
/// variant is a per-request failure and must leave the connection and the
/// pet's balance untouched.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Invalid credentials")]
    #[diagnostic(
        code(motchi_core::unauthorized),
        help("Present a valid access token when connecting")
    )]
    Unauthorized { reason: String },

    #[error("User has no pet")]
    #[diagnostic(
        code(motchi_core::no_pet),
        help("Create a pet first, or have the other owner add this user as a co-owner")
    )]
    NoPet { user_id: UserId },

    #[error("Ambiguous pet ownership for user {user_id}")]
    #[diagnostic(
        code(motchi_core::ambiguous_ownership),
        help(
            "The user both owns a pet and is registered as co-owner of a different one; the data needs repair"
        )
    )]
    AmbiguousOwnership { user_id: UserId },

    #[error("Pet not found")]
    #[diagnostic(code(motchi_core::pet_not_found))]
    PetNotFound { pet_id: PetId },

    #[error("User not found")]
    #[diagnostic(code(motchi_core::user_not_found))]
    UserNotFound,

    #[error("Username '{username}' is already taken")]
    #[diagnostic(
        code(motchi_core::username_taken),
        help("Pick a different username")
    )]
    UsernameTaken { username: String },

    #[error("User already has a pet")]
    #[diagnostic(
        code(motchi_core::already_has_pet),
        help("Each user can be the main owner of at most one pet")
    )]
    AlreadyHasPet { user_id: UserId },

    #[error("Pet already has a co-owner")]
    #[diagnostic(
        code(motchi_core::co_owner_already_set),
        help("A pet has at most two owners and the second slot is set exactly once")
    )]
    CoOwnerAlreadySet { pet_id: PetId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),
}

impl CoreError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Whether this error should tear down the connection it occurred on
    pub fn is_connection_terminal(&self) -> bool {
        matches!(self, CoreError::Unauthorized { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
