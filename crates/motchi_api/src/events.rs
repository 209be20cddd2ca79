//! WebSocket message types for the real-time co-ownership stream
//!
//! Every frame is an internally tagged record. Servers reply to each
//! request with exactly one result message; a successful spend additionally
//! produces one unsolicited [`ServerMessage::SpendResult`] push to the
//! other owner, carrying the same authoritative balance and the
//! server-resolved pet id (never a client-supplied one).

use motchi_core::{Pet, PetId, UserId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Client → server messages
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request a read-only snapshot of the caller's pet
    GetState,

    /// Spend `amount` from the pet's balance (negative deposits)
    SpendMoney { amount: i64 },

    /// Heartbeat acknowledgment
    Pong,
}

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to [`ClientMessage::GetState`]
    StateResult {
        status: ResultStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        pet: Option<PetSnapshot>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Reply to [`ClientMessage::SpendMoney`], and the shape of the peer
    /// push after a successful spend
    SpendResult {
        status: ResultStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_money: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pet_id: Option<PetId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Server-initiated heartbeat
    Ping,
}

/// Success/failure discriminant on result messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Fail,
}

/// Read-only view of a pet as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PetSnapshot {
    pub id: PetId,
    pub money: i64,
    pub health: u8,
    pub hunger: u8,
    pub happiness: u8,
    pub main_owner: UserId,
    pub owner2: Option<UserId>,
}

impl From<Pet> for PetSnapshot {
    fn from(pet: Pet) -> Self {
        Self {
            id: pet.id,
            money: pet.money,
            health: pet.health,
            hunger: pet.hunger,
            happiness: pet.happiness,
            main_owner: pet.main_owner,
            owner2: pet.owner2,
        }
    }
}

impl ServerMessage {
    pub fn state_success(pet: impl Into<PetSnapshot>) -> Self {
        Self::StateResult {
            status: ResultStatus::Success,
            pet: Some(pet.into()),
            message: None,
        }
    }

    pub fn state_fail(message: impl Into<String>) -> Self {
        Self::StateResult {
            status: ResultStatus::Fail,
            pet: None,
            message: Some(message.into()),
        }
    }

    pub fn spend_success(pet_id: PetId, new_money: i64) -> Self {
        Self::SpendResult {
            status: ResultStatus::Success,
            new_money: Some(new_money),
            pet_id: Some(pet_id),
            message: None,
        }
    }

    pub fn spend_fail(message: impl Into<String>) -> Self {
        Self::SpendResult {
            status: ResultStatus::Fail,
            new_money: None,
            pet_id: None,
            message: Some(message.into()),
        }
    }
}
