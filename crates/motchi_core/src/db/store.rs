//! SurrealDB-backed pet and account storage
//!
//! Database records carry raw `RecordId`s and are converted to domain types
//! at the edge. Balance updates serialize per pet through a lock table so
//! the non-negative invariant holds under true parallelism regardless of
//! the engine's own transaction behavior.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, Surreal, engine::any::Any};
use tokio::sync::Mutex;

use crate::{
    db::DatabaseError,
    error::{CoreError, Result},
    id::{PetId, UserId},
    pet::Pet,
    store::{PetHandle, PetStore, SpendOutcome},
    user::User,
};

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    id: RecordId,
    username: String,
    password_hash: String,
    pet_id: Option<RecordId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PetRecord {
    id: RecordId,
    main_owner: RecordId,
    owner2: Option<RecordId>,
    money: i64,
    health: u8,
    hunger: u8,
    happiness: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Write-side content, without `id` (the record key is passed separately)
#[derive(Debug, Serialize)]
struct UserContent {
    username: String,
    password_hash: String,
    pet_id: Option<RecordId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct PetContent {
    main_owner: RecordId,
    owner2: Option<RecordId>,
    money: i64,
    health: u8,
    hunger: u8,
    happiness: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct MoneyPatch {
    money: i64,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn into_user(self) -> Result<User> {
        Ok(User {
            id: UserId::from_record(self.id).map_err(DatabaseError::malformed)?,
            username: self.username,
            password_hash: self.password_hash,
            pet_id: self
                .pet_id
                .map(PetId::from_record)
                .transpose()
                .map_err(DatabaseError::malformed)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PetRecord {
    fn into_pet(self) -> Result<Pet> {
        Ok(Pet {
            id: PetId::from_record(self.id).map_err(DatabaseError::malformed)?,
            main_owner: UserId::from_record(self.main_owner).map_err(DatabaseError::malformed)?,
            owner2: self
                .owner2
                .map(UserId::from_record)
                .transpose()
                .map_err(DatabaseError::malformed)?,
            money: self.money,
            health: self.health,
            hunger: self.hunger,
            happiness: self.happiness,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB-backed [`PetStore`] plus the account/pet management operations
/// the HTTP surface needs.
pub struct SurrealStore {
    db: Surreal<Any>,
    /// Per-pet update locks; held across the read-check-write in `spend`
    locks: DashMap<PetId, Arc<Mutex<()>>>,
}

impl SurrealStore {
    pub fn new(db: Surreal<Any>) -> Self {
        Self {
            db,
            locks: DashMap::new(),
        }
    }

    /// Connect and wrap in one step
    pub async fn connect(url: &str) -> Result<Self> {
        let db = crate::db::connect(url).await?;
        Ok(Self::new(db))
    }

    /// Create a new account. The caller is expected to have hashed the
    /// password already; plaintext never reaches this layer.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = User::new(username, password_hash);
        let content = UserContent {
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            pet_id: None,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };

        let created: Option<UserRecord> = self
            .db
            .create(("user", user.id.to_record_key()))
            .content(content)
            .await
            .map_err(|e| {
                if e.to_string().contains("user_username") {
                    CoreError::UsernameTaken {
                        username: username.to_string(),
                    }
                } else {
                    DatabaseError::query(e).into()
                }
            })?;

        created
            .ok_or_else(|| DatabaseError::NotFound {
                entity: format!("user {}", user.id),
            })?
            .into_user()
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User> {
        let mut result = self
            .db
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username.to_string()))
            .await
            .map_err(DatabaseError::query)?;

        let record: Option<UserRecord> = result.take(0).map_err(DatabaseError::query)?;
        record.ok_or(CoreError::UserNotFound)?.into_user()
    }

    pub async fn user_by_id(&self, user: UserId) -> Result<User> {
        self.user_record(user).await?.into_user()
    }

    /// Create the caller's pet and link it to their account. Each user can
    /// be the main owner of at most one pet.
    pub async fn create_pet(&self, owner: UserId) -> Result<Pet> {
        // Existence check up front so a missing account is not misreported
        self.user_record(owner).await?;

        let pet = Pet::new(owner);
        let content = PetContent {
            main_owner: owner.into(),
            owner2: None,
            money: pet.money,
            health: pet.health,
            hunger: pet.hunger,
            happiness: pet.happiness,
            created_at: pet.created_at,
            updated_at: pet.updated_at,
        };

        // Link and insert are one transaction: the conditional UPDATE
        // claims the user's single pet slot, so two racing calls cannot
        // both create, and a failed insert cannot leave a dangling link
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $linked = (UPDATE $user SET pet_id = $pet, updated_at = $now \
                     WHERE pet_id = NONE); \
                 IF array::len($linked) == 0 { THROW 'already_has_pet' }; \
                 CREATE type::thing('pet', $key) CONTENT $content; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user", RecordId::from(owner)))
            .bind(("pet", RecordId::from(pet.id)))
            .bind(("key", pet.id.to_record_key()))
            .bind(("now", Utc::now()))
            .bind(("content", content))
            .await
            .map_err(DatabaseError::query)?;

        result.check().map_err(|e| {
            if e.to_string().contains("already_has_pet") {
                CoreError::AlreadyHasPet { user_id: owner }
            } else {
                DatabaseError::query(e).into()
            }
        })?;

        Ok(pet)
    }

    /// Set `owner2` on the caller's pet, exactly once. Only the main owner
    /// holds a `pet_id` link, so only the main owner can add a co-owner.
    pub async fn add_co_owner(&self, caller: UserId, target_username: &str) -> Result<Pet> {
        let record = self.user_record(caller).await?;
        let pet_id = record
            .pet_id
            .map(PetId::from_record)
            .transpose()
            .map_err(DatabaseError::malformed)?
            .ok_or(CoreError::NoPet { user_id: caller })?;

        let target = self.user_by_username(target_username).await?;

        // Conditional write: the second owner slot is claimed only if empty
        let mut result = self
            .db
            .query(
                "UPDATE $pet SET owner2 = $target, updated_at = $now \
                 WHERE owner2 = NONE RETURN AFTER",
            )
            .bind(("pet", RecordId::from(pet_id)))
            .bind(("target", RecordId::from(target.id)))
            .bind(("now", Utc::now()))
            .await
            .map_err(DatabaseError::query)?;

        let updated: Option<PetRecord> = result.take(0).map_err(DatabaseError::query)?;
        if updated.is_some() {
            tracing::debug!(pet_id = %pet_id, co_owner = %target.id, "second owner slot claimed");
        }
        updated
            .ok_or(CoreError::CoOwnerAlreadySet { pet_id })?
            .into_pet()
    }

    async fn user_record(&self, user: UserId) -> Result<UserRecord> {
        let record: Option<UserRecord> = self
            .db
            .select(("user", user.to_record_key()))
            .await
            .map_err(DatabaseError::query)?;
        record.ok_or(CoreError::UserNotFound)
    }

    async fn pet_record(&self, pet: PetId) -> Result<PetRecord> {
        let record: Option<PetRecord> = self
            .db
            .select(("pet", pet.to_record_key()))
            .await
            .map_err(DatabaseError::query)?;
        record.ok_or(CoreError::PetNotFound { pet_id: pet })
    }

    /// Pet where `user` sits in the co-owner slot, if any
    async fn co_owned_pet(&self, user: UserId) -> Result<Option<PetRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM pet WHERE owner2 = $user LIMIT 1")
            .bind(("user", RecordId::from(user)))
            .await
            .map_err(DatabaseError::query)?;

        Ok(result.take(0).map_err(DatabaseError::query)?)
    }

    fn pet_lock(&self, pet: PetId) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard lock is not held across awaits
        self.locks
            .entry(pet)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

#[async_trait]
impl PetStore for SurrealStore {
    async fn pet_for(&self, user: UserId) -> Result<PetHandle> {
        let record = self.user_record(user).await?;
        let own = record
            .pet_id
            .map(PetId::from_record)
            .transpose()
            .map_err(DatabaseError::malformed)?;
        let co_owned = self.co_owned_pet(user).await?;

        let pet = match (own, co_owned) {
            (Some(own_id), Some(co)) => {
                let co_pet = co.into_pet()?;
                if co_pet.id != own_id {
                    // Malformed data: the identity matches both resolution
                    // steps with different pets. Reported, never guessed at.
                    return Err(CoreError::AmbiguousOwnership { user_id: user });
                }
                co_pet
            }
            (Some(own_id), None) => self.pet_record(own_id).await?.into_pet()?,
            (None, Some(co)) => co.into_pet()?,
            (None, None) => return Err(CoreError::NoPet { user_id: user }),
        };

        Ok(PetHandle {
            pet_id: pet.id,
            other_owner: pet.other_owner(user),
        })
    }

    async fn spend(&self, pet: PetId, amount: i64) -> Result<SpendOutcome> {
        let lock = self.pet_lock(pet);
        let _guard = lock.lock().await;

        let record = self.pet_record(pet).await?;
        if amount > record.money {
            return Ok(SpendOutcome::InsufficientFunds {
                money: record.money,
            });
        }

        // After the guard only a deposit can overflow; clamp it rather
        // than wrap (a wrapped subtraction would store a negative balance)
        let new_money = record.money.saturating_sub(amount);
        let _updated: Option<PetRecord> = self
            .db
            .update(("pet", pet.to_record_key()))
            .merge(MoneyPatch {
                money: new_money,
                updated_at: Utc::now(),
            })
            .await
            .map_err(DatabaseError::query)?;

        tracing::debug!(pet_id = %pet, amount, new_money, "balance updated");
        Ok(SpendOutcome::Applied { new_money })
    }

    async fn snapshot(&self, pet: PetId) -> Result<Pet> {
        self.pet_record(pet).await?.into_pet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_store() -> SurrealStore {
        SurrealStore::connect("mem://").await.unwrap()
    }

    async fn user_with_pet(store: &SurrealStore, username: &str) -> (UserId, PetId) {
        let user = store.create_user(username, "hash").await.unwrap();
        let pet = store.create_pet(user.id).await.unwrap();
        (user.id, pet.id)
    }

    /// Deposits go through the same single point of mutation
    async fn fund(store: &SurrealStore, pet: PetId, amount: i64) {
        match store.spend(pet, -amount).await.unwrap() {
            SpendOutcome::Applied { .. } => {}
            other => panic!("funding rejected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_user_unique_username() {
        let store = test_store().await;
        store.create_user("alice", "h1").await.unwrap();

        let err = store.create_user("alice", "h2").await.unwrap_err();
        assert!(matches!(err, CoreError::UsernameTaken { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let store = test_store().await;
        let created = store.create_user("bob", "hash").await.unwrap();

        let by_name = store.user_by_username("bob").await.unwrap();
        assert_eq!(by_name.id, created.id);

        let by_id = store.user_by_id(created.id).await.unwrap();
        assert_eq!(by_id.username, "bob");

        let err = store.user_by_username("nobody").await.unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound));
    }

    #[tokio::test]
    async fn test_one_pet_per_owner() {
        let store = test_store().await;
        let user = store.create_user("carol", "hash").await.unwrap();

        let pet = store.create_pet(user.id).await.unwrap();
        assert_eq!(pet.main_owner, user.id);
        assert_eq!(pet.money, 0);

        let err = store.create_pet(user.id).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyHasPet { .. }));

        // The link lands on the user record
        let reloaded = store.user_by_id(user.id).await.unwrap();
        assert_eq!(reloaded.pet_id, Some(pet.id));
    }

    #[tokio::test]
    async fn test_co_owner_set_once() {
        let store = test_store().await;
        let (a, pet) = user_with_pet(&store, "main").await;
        store.create_user("second", "hash").await.unwrap();
        store.create_user("third", "hash").await.unwrap();

        let updated = store.add_co_owner(a, "second").await.unwrap();
        assert_eq!(updated.id, pet);
        assert!(updated.owner2.is_some());

        let err = store.add_co_owner(a, "third").await.unwrap_err();
        assert!(matches!(err, CoreError::CoOwnerAlreadySet { .. }));
    }

    #[tokio::test]
    async fn test_pet_for_main_owner() {
        let store = test_store().await;
        let (a, pet) = user_with_pet(&store, "main").await;

        let handle = store.pet_for(a).await.unwrap();
        assert_eq!(handle.pet_id, pet);
        assert_eq!(handle.other_owner, None);
    }

    #[tokio::test]
    async fn test_pet_for_co_owner_fallback() {
        let store = test_store().await;
        let (a, pet) = user_with_pet(&store, "main").await;
        let b = store.create_user("second", "hash").await.unwrap();
        store.add_co_owner(a, "second").await.unwrap();

        // b has no pet_id of their own; resolution falls back to owner2
        let handle = store.pet_for(b.id).await.unwrap();
        assert_eq!(handle.pet_id, pet);
        assert_eq!(handle.other_owner, Some(a));

        // and each side resolves the other as peer
        let handle = store.pet_for(a).await.unwrap();
        assert_eq!(handle.other_owner, Some(b.id));
    }

    #[tokio::test]
    async fn test_pet_for_no_pet() {
        let store = test_store().await;
        let lonely = store.create_user("lonely", "hash").await.unwrap();

        let err = store.pet_for(lonely.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NoPet { .. }));
    }

    #[tokio::test]
    async fn test_pet_for_ambiguous_ownership() {
        let store = test_store().await;
        let (a, _pet_a) = user_with_pet(&store, "main").await;
        // c owns a pet of their own AND gets added as co-owner of a's pet
        let (c, _pet_c) = user_with_pet(&store, "greedy").await;
        store.add_co_owner(a, "greedy").await.unwrap();

        let err = store.pet_for(c).await.unwrap_err();
        assert!(matches!(err, CoreError::AmbiguousOwnership { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_spend_and_deposit() {
        let store = test_store().await;
        let (_a, pet) = user_with_pet(&store, "main").await;
        fund(&store, pet, 10).await;

        let outcome = store.spend(pet, 4).await.unwrap();
        assert_eq!(outcome, SpendOutcome::Applied { new_money: 6 });
        assert_eq!(store.snapshot(pet).await.unwrap().money, 6);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_side_effects() {
        let store = test_store().await;
        let (_a, pet) = user_with_pet(&store, "main").await;
        fund(&store, pet, 6).await;

        let outcome = store.spend(pet, 100).await.unwrap();
        assert_eq!(outcome, SpendOutcome::InsufficientFunds { money: 6 });

        // Rejection leaves the stored balance untouched
        assert_eq!(store.snapshot(pet).await.unwrap().money, 6);
    }

    #[tokio::test]
    async fn test_extreme_amounts_never_corrupt_balance() {
        let store = test_store().await;
        let (_a, pet) = user_with_pet(&store, "main").await;
        fund(&store, pet, 10).await;

        // A spend of i64::MAX is an ordinary rejection
        let outcome = store.spend(pet, i64::MAX).await.unwrap();
        assert_eq!(outcome, SpendOutcome::InsufficientFunds { money: 10 });
        assert_eq!(store.snapshot(pet).await.unwrap().money, 10);

        // A deposit of i64::MIN magnitude clamps instead of wrapping to a
        // negative stored balance
        let outcome = store.spend(pet, i64::MIN).await.unwrap();
        assert_eq!(
            outcome,
            SpendOutcome::Applied {
                new_money: i64::MAX
            }
        );
        assert_eq!(store.snapshot(pet).await.unwrap().money, i64::MAX);
    }

    #[tokio::test]
    async fn test_concurrent_pet_creation_yields_one_pet() {
        let store = Arc::new(test_store().await);
        let user = store.create_user("eager", "hash").await.unwrap();

        // Both calls pass any read-side check at the same time; the
        // transactional slot claim lets exactly one create
        let (left, right) = tokio::join!(store.create_pet(user.id), store.create_pet(user.id));
        let outcomes = [left, right];

        // The loser reports either the domain error or a commit conflict,
        // but never a second pet
        let created = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(created, 1, "exactly one creation wins: {outcomes:?}");

        // The link points at the surviving pet
        let winner = outcomes.into_iter().flatten().next().unwrap();
        let reloaded = store.user_by_id(user.id).await.unwrap();
        assert_eq!(reloaded.pet_id, Some(winner.id));
        assert_eq!(store.snapshot(winner.id).await.unwrap().main_owner, user.id);
    }

    #[tokio::test]
    async fn test_spend_unknown_pet() {
        let store = test_store().await;
        let err = store.spend(PetId::generate(), 1).await.unwrap_err();
        assert!(matches!(err, CoreError::PetNotFound { .. }));
    }

    #[tokio::test]
    async fn test_simultaneous_spends_serialize() {
        let store = Arc::new(test_store().await);
        let (_a, pet) = user_with_pet(&store, "main").await;
        fund(&store, pet, 10).await;

        // Both owners race a spend of 6 against a balance of 10: exactly
        // one applies, the other is rejected, and 10-6-6 never happens.
        let (left, right) = tokio::join!(store.spend(pet, 6), store.spend(pet, 6));
        let outcomes = [left.unwrap(), right.unwrap()];

        let applied = outcomes
            .iter()
            .filter(|o| matches!(o, SpendOutcome::Applied { .. }))
            .count();
        assert_eq!(applied, 1, "exactly one spend wins: {outcomes:?}");
        assert_eq!(store.snapshot(pet).await.unwrap().money, 4);
    }

    #[tokio::test]
    async fn test_invariant_under_many_concurrent_spends() {
        let store = Arc::new(test_store().await);
        let (_a, pet) = user_with_pet(&store, "main").await;
        fund(&store, pet, 10).await;

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.spend(pet, 1).await.unwrap() })
            })
            .collect();

        let mut applied = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), SpendOutcome::Applied { .. }) {
                applied += 1;
            }
        }

        // Only as many spends as the balance covered, and never below zero
        assert_eq!(applied, 10);
        assert_eq!(store.snapshot(pet).await.unwrap().money, 0);
    }
}
