//! Per-connection session handling
//!
//! Each WebSocket connection is driven by one [`Session`] on its own task:
//! an explicit state machine `Connecting → Authenticating → Active →
//! Closing → Closed`. Authentication happens before the upgrade, so a
//! session is born already bound to an identity; it registers itself,
//! serves requests from a single `select!` loop, and unregisters exactly
//! once on the way out, whatever ended it (read failure, explicit close,
//! eviction by a newer login, or a missed heartbeat).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use motchi_api::events::{ClientMessage, ServerMessage};
use motchi_core::{CoreError, PetStore, SpendOutcome, UserId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::registry::{ConnectionHandle, ConnectionRegistry, SessionCommand};

/// Protocol states a connection moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Active,
    Closing,
    Closed,
}

/// What the heartbeat tick decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickAction {
    /// Send a ping and start waiting for its acknowledgment
    SendPing,
    /// The previous ping was never acknowledged; the connection is dead
    Dead,
}

/// Heartbeat liveness tracking: one outstanding ping at a time, reap on a
/// full period without acknowledgment.
#[derive(Debug, Default)]
pub(crate) struct Liveness {
    awaiting_pong: bool,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_tick(&mut self) -> TickAction {
        if self.awaiting_pong {
            TickAction::Dead
        } else {
            self.awaiting_pong = true;
            TickAction::SendPing
        }
    }

    pub(crate) fn on_pong(&mut self) {
        self.awaiting_pong = false;
    }
}

/// Reply to the requester, plus at most one push to the peer co-owner
#[derive(Debug)]
pub(crate) struct SessionOutput {
    pub(crate) reply: ServerMessage,
    pub(crate) push: Option<(UserId, ServerMessage)>,
}

impl SessionOutput {
    fn reply_only(reply: ServerMessage) -> Self {
        Self { reply, push: None }
    }
}

/// The protocol state machine for one authenticated connection
pub struct Session {
    user_id: UserId,
    conn_id: Uuid,
    state: SessionState,
    store: Arc<dyn PetStore>,
    registry: Arc<ConnectionRegistry>,
    heartbeat_interval: Duration,
}

impl Session {
    pub fn new(
        user_id: UserId,
        store: Arc<dyn PetStore>,
        registry: Arc<ConnectionRegistry>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            user_id,
            conn_id: Uuid::new_v4(),
            state: SessionState::Authenticating,
            store,
            registry,
            heartbeat_interval,
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the connection to completion. Consumes the session; when this
    /// returns, the registry entry is gone and the socket is dropped.
    pub async fn run(mut self, mut socket: WebSocket) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // `register` already told any prior connection to terminate
        let _evicted = self
            .registry
            .register(self.user_id, ConnectionHandle::new(self.conn_id, tx));
        self.state = SessionState::Active;
        info!(user_id = %self.user_id, conn_id = %self.conn_id, "session active");

        let mut liveness = Liveness::new();
        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately and arms the first ping
        loop {
            tokio::select! {
                frame = socket.recv() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(output) = self.process_text(&text, &mut liveness).await {
                            if !send_json(&mut socket, &output.reply).await {
                                break;
                            }
                            // Caller's reply goes out before the peer push
                            if let Some((peer, push)) = output.push {
                                let delivered = self.registry.deliver(peer, push);
                                debug!(
                                    user_id = %self.user_id,
                                    peer = %peer,
                                    delivered,
                                    "peer notification"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => liveness.on_pong(),
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(user_id = %self.user_id, "client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {} // binary and protocol pings carry no business payload
                    Some(Err(e)) => {
                        warn!(user_id = %self.user_id, error = %e, "read failed");
                        break;
                    }
                },
                command = rx.recv() => match command {
                    Some(SessionCommand::Deliver(message)) => {
                        if !send_json(&mut socket, &message).await {
                            break;
                        }
                    }
                    Some(SessionCommand::Terminate) | None => {
                        info!(
                            user_id = %self.user_id,
                            conn_id = %self.conn_id,
                            "session evicted by newer connection"
                        );
                        break;
                    }
                },
                _ = heartbeat.tick() => match liveness.on_tick() {
                    TickAction::SendPing => {
                        if !send_json(&mut socket, &ServerMessage::Ping).await {
                            break;
                        }
                    }
                    TickAction::Dead => {
                        warn!(
                            user_id = %self.user_id,
                            conn_id = %self.conn_id,
                            "heartbeat unacknowledged, reaping connection"
                        );
                        break;
                    }
                },
            }
        }

        self.state = SessionState::Closing;
        // Guarded by conn_id: a no-op if a newer connection took the slot
        self.registry.unregister(self.user_id, self.conn_id);
        self.state = SessionState::Closed;
        info!(user_id = %self.user_id, conn_id = %self.conn_id, "session closed");
    }

    /// Handle one inbound text frame.
    ///
    /// Recognized requests produce output; pongs feed the liveness monitor;
    /// anything unparseable is logged and dropped without disturbing the
    /// connection (robustness over strictness on a long-lived stream).
    pub(crate) async fn process_text(
        &self,
        text: &str,
        liveness: &mut Liveness,
    ) -> Option<SessionOutput> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Pong) => {
                liveness.on_pong();
                None
            }
            Ok(msg) => self.handle_client_message(msg).await,
            Err(e) => {
                debug!(
                    user_id = %self.user_id,
                    error = %e,
                    "ignoring unrecognized message"
                );
                None
            }
        }
    }

    /// Serve one request. Every recognized request yields exactly one reply;
    /// only a successfully applied spend also yields a peer push.
    pub(crate) async fn handle_client_message(
        &self,
        message: ClientMessage,
    ) -> Option<SessionOutput> {
        match message {
            ClientMessage::GetState => Some(self.handle_get_state().await),
            ClientMessage::SpendMoney { amount } => Some(self.handle_spend(amount).await),
            ClientMessage::Pong => None, // consumed by the run loop
        }
    }

    async fn handle_get_state(&self) -> SessionOutput {
        let handle = match self.store.pet_for(self.user_id).await {
            Ok(handle) => handle,
            Err(e) => return SessionOutput::reply_only(state_failure(&e, self.user_id)),
        };

        match self.store.snapshot(handle.pet_id).await {
            Ok(pet) => SessionOutput::reply_only(ServerMessage::state_success(pet)),
            Err(e) => SessionOutput::reply_only(state_failure(&e, self.user_id)),
        }
    }

    async fn handle_spend(&self, amount: i64) -> SessionOutput {
        let handle = match self.store.pet_for(self.user_id).await {
            Ok(handle) => handle,
            Err(e) => return SessionOutput::reply_only(spend_failure(&e, self.user_id)),
        };

        match self.store.spend(handle.pet_id, amount).await {
            Ok(SpendOutcome::Applied { new_money }) => {
                info!(
                    user_id = %self.user_id,
                    pet_id = %handle.pet_id,
                    amount,
                    new_money,
                    "balance updated"
                );
                let result = ServerMessage::spend_success(handle.pet_id, new_money);
                SessionOutput {
                    reply: result.clone(),
                    // The push carries the server-resolved pet id and the
                    // exact balance the caller was told
                    push: handle.other_owner.map(|peer| (peer, result)),
                }
            }
            Ok(SpendOutcome::InsufficientFunds { money }) => {
                debug!(
                    user_id = %self.user_id,
                    pet_id = %handle.pet_id,
                    amount,
                    money,
                    "spend rejected, insufficient funds"
                );
                SessionOutput::reply_only(ServerMessage::spend_fail(
                    "insufficient funds. Pet money cannot go below 0",
                ))
            }
            Err(e) => SessionOutput::reply_only(spend_failure(&e, self.user_id)),
        }
    }
}

/// Serialize and send one message; false means the transport failed
async fn send_json(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            error!(error = %e, "failed to serialize outbound message");
            true
        }
    }
}

fn state_failure(err: &CoreError, user_id: UserId) -> ServerMessage {
    match err {
        CoreError::NoPet { .. } => ServerMessage::state_fail("Caller has no pet"),
        CoreError::PetNotFound { .. } => ServerMessage::state_fail("Pet not found"),
        _ => {
            error!(user_id = %user_id, error = %err, "state query failed");
            ServerMessage::state_fail("Server error retrieving pet data")
        }
    }
}

fn spend_failure(err: &CoreError, user_id: UserId) -> ServerMessage {
    match err {
        CoreError::NoPet { .. } => ServerMessage::spend_fail("Caller has no pet to operate on"),
        _ => {
            error!(user_id = %user_id, error = %err, "spend failed");
            ServerMessage::spend_fail("Server error occurred")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motchi_api::events::ResultStatus;
    use motchi_core::db::SurrealStore;
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: Arc<SurrealStore>,
        registry: Arc<ConnectionRegistry>,
        owner_a: UserId,
        owner_b: UserId,
        pet: motchi_core::PetId,
    }

    /// Two users co-owning one pet with the given starting balance
    async fn fixture(balance: i64) -> Fixture {
        let store = Arc::new(SurrealStore::connect("mem://").await.unwrap());
        let a = store.create_user("alice", "hash").await.unwrap();
        let b = store.create_user("bob", "hash").await.unwrap();
        let pet = store.create_pet(a.id).await.unwrap();
        store.add_co_owner(a.id, "bob").await.unwrap();
        if balance != 0 {
            store.spend(pet.id, -balance).await.unwrap();
        }
        Fixture {
            store,
            registry: Arc::new(ConnectionRegistry::new()),
            owner_a: a.id,
            owner_b: b.id,
            pet: pet.id,
        }
    }

    fn session_for(fx: &Fixture, user: UserId) -> Session {
        Session::new(
            user,
            fx.store.clone(),
            fx.registry.clone(),
            Duration::from_secs(60),
        )
    }

    /// Register a fake peer connection and get the receiving end
    fn connect_peer(
        fx: &Fixture,
        user: UserId,
    ) -> mpsc::UnboundedReceiver<SessionCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        fx.registry
            .register(user, ConnectionHandle::new(Uuid::new_v4(), tx));
        rx
    }

    /// Run one message the way the session loop would: reply, then push
    async fn serve(session: &Session, fx: &Fixture, msg: ClientMessage) -> ServerMessage {
        let output = session.handle_client_message(msg).await.unwrap();
        if let Some((peer, push)) = output.push {
            fx.registry.deliver(peer, push);
        }
        output.reply
    }

    #[tokio::test]
    async fn test_get_state_returns_snapshot() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);

        let reply = serve(&session, &fx, ClientMessage::GetState).await;
        match reply {
            ServerMessage::StateResult {
                status, pet: Some(pet), ..
            } => {
                assert_eq!(status, ResultStatus::Success);
                assert_eq!(pet.id, fx.pet);
                assert_eq!(pet.money, 10);
                assert_eq!(pet.owner2, Some(fx.owner_b));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_state_without_pet_fails_softly() {
        let fx = fixture(0).await;
        let lonely = fx.store.create_user("lonely", "hash").await.unwrap();
        let session = session_for(&fx, lonely.id);

        let reply = serve(&session, &fx, ClientMessage::GetState).await;
        match reply {
            ServerMessage::StateResult { status, message, .. } => {
                assert_eq!(status, ResultStatus::Fail);
                assert_eq!(message.as_deref(), Some("Caller has no pet"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spend_relays_to_connected_peer() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);
        let mut peer_rx = connect_peer(&fx, fx.owner_b);

        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: 4 }).await;
        assert_eq!(reply, ServerMessage::spend_success(fx.pet, 6));

        // B receives the exact balance A was told
        match peer_rx.try_recv().unwrap() {
            SessionCommand::Deliver(push) => {
                assert_eq!(push, ServerMessage::spend_success(fx.pet, 6));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spend_without_peer_connected_pushes_nothing() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);

        let output = session
            .handle_client_message(ClientMessage::SpendMoney { amount: 4 })
            .await
            .unwrap();

        // The push target exists (B co-owns) but nothing is delivered
        let (peer, push) = output.push.expect("push should target the co-owner");
        assert_eq!(peer, fx.owner_b);
        assert!(!fx.registry.deliver(peer, push));
    }

    #[tokio::test]
    async fn test_sole_owner_spend_has_no_push_target() {
        let store = Arc::new(SurrealStore::connect("mem://").await.unwrap());
        let a = store.create_user("solo", "hash").await.unwrap();
        let pet = store.create_pet(a.id).await.unwrap();
        store.spend(pet.id, -5).await.unwrap();

        let session = Session::new(
            a.id,
            store.clone(),
            Arc::new(ConnectionRegistry::new()),
            Duration::from_secs(60),
        );
        let output = session
            .handle_client_message(ClientMessage::SpendMoney { amount: 2 })
            .await
            .unwrap();

        assert_eq!(output.reply, ServerMessage::spend_success(pet.id, 3));
        assert!(output.push.is_none());
    }

    #[tokio::test]
    async fn test_rejection_reaches_caller_only_and_leaks_no_state() {
        let fx = fixture(6).await;
        let session = session_for(&fx, fx.owner_a);
        let mut peer_rx = connect_peer(&fx, fx.owner_b);

        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: 100 }).await;
        match reply {
            ServerMessage::SpendResult { status, message, new_money, .. } => {
                assert_eq!(status, ResultStatus::Fail);
                assert!(message.unwrap().contains("insufficient funds"));
                assert_eq!(new_money, None);
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        // No peer push, stored balance unchanged
        assert!(peer_rx.try_recv().is_err());
        assert_eq!(fx.store.snapshot(fx.pet).await.unwrap().money, 6);
    }

    #[tokio::test]
    async fn test_spend_then_overdraft_scenario() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);
        let mut peer_rx = connect_peer(&fx, fx.owner_b);

        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: 4 }).await;
        assert_eq!(reply, ServerMessage::spend_success(fx.pet, 6));
        assert!(matches!(
            peer_rx.try_recv().unwrap(),
            SessionCommand::Deliver(_)
        ));

        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: 100 }).await;
        assert!(matches!(
            reply,
            ServerMessage::SpendResult {
                status: ResultStatus::Fail,
                ..
            }
        ));
        assert!(peer_rx.try_recv().is_err());
        assert_eq!(fx.store.snapshot(fx.pet).await.unwrap().money, 6);
    }

    #[tokio::test]
    async fn test_spend_without_pet_fails_softly() {
        let fx = fixture(0).await;
        let lonely = fx.store.create_user("lonely", "hash").await.unwrap();
        let session = session_for(&fx, lonely.id);

        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: 1 }).await;
        match reply {
            ServerMessage::SpendResult { status, message, .. } => {
                assert_eq!(status, ResultStatus::Fail);
                assert_eq!(message.as_deref(), Some("Caller has no pet to operate on"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_frames_ignored_session_keeps_serving() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);
        let mut liveness = Liveness::new();

        // Unknown types, wrong shapes and non-JSON all produce no output
        for garbage in [
            r#"{"type":"dance"}"#,
            r#"{"type":"spend_money","amount":"six"}"#,
            "not json at all",
            "",
        ] {
            assert!(session.process_text(garbage, &mut liveness).await.is_none());
        }

        // and the connection still serves requests afterwards
        let output = session
            .process_text(r#"{"type":"spend_money","amount":4}"#, &mut liveness)
            .await
            .unwrap();
        assert_eq!(output.reply, ServerMessage::spend_success(fx.pet, 6));
    }

    #[tokio::test]
    async fn test_extreme_wire_amounts_are_safe() {
        let fx = fixture(10).await;
        let session = session_for(&fx, fx.owner_a);
        let mut liveness = Liveness::new();

        // i64::MIN straight off the wire: a clamped deposit, not a panic
        // or a wrapped-negative balance
        let output = session
            .process_text(
                &format!(r#"{{"type":"spend_money","amount":{}}}"#, i64::MIN),
                &mut liveness,
            )
            .await
            .unwrap();
        assert_eq!(
            output.reply,
            ServerMessage::spend_success(fx.pet, i64::MAX)
        );

        // i64::MAX is an ordinary insufficient-funds rejection
        let reply = serve(&session, &fx, ClientMessage::SpendMoney { amount: i64::MAX }).await;
        assert!(matches!(
            reply,
            ServerMessage::SpendResult {
                status: ResultStatus::Fail,
                ..
            }
        ));
        assert_eq!(fx.store.snapshot(fx.pet).await.unwrap().money, i64::MAX);
    }

    #[tokio::test]
    async fn test_wire_pong_feeds_liveness() {
        let fx = fixture(0).await;
        let session = session_for(&fx, fx.owner_a);
        let mut liveness = Liveness::new();

        assert_eq!(liveness.on_tick(), TickAction::SendPing);
        let out = session.process_text(r#"{"type":"pong"}"#, &mut liveness).await;
        assert!(out.is_none());
        // Acknowledged, so the next tick pings again instead of reaping
        assert_eq!(liveness.on_tick(), TickAction::SendPing);
    }

    #[test]
    fn test_liveness_reaps_after_one_silent_period() {
        let mut liveness = Liveness::new();
        assert_eq!(liveness.on_tick(), TickAction::SendPing);
        // No pong before the next tick: dead
        assert_eq!(liveness.on_tick(), TickAction::Dead);
    }

    #[test]
    fn test_liveness_survives_while_acknowledged() {
        let mut liveness = Liveness::new();
        for _ in 0..5 {
            assert_eq!(liveness.on_tick(), TickAction::SendPing);
            liveness.on_pong();
        }
    }
}
