//! Connection registry: identity → live connection
//!
//! The only shared mutable state in the hub. Each entry maps a user to the
//! command channel of their one live session; each operation is a single
//! atomic dashmap call (`insert`, `remove_if`, `get`) so
//! register/unregister/lookup are linearizable with respect to each other.
//! The registry is created empty by the composition root and handed to
//! sessions explicitly.

use dashmap::DashMap;
use motchi_api::events::ServerMessage;
use motchi_core::UserId;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Commands a session receives from outside its own socket
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Push a message to this session's client
    Deliver(ServerMessage),
    /// Shut down: a newer connection for the same identity took over
    Terminate,
}

/// Non-owning reference to a live session, keyed by identity.
///
/// The session itself owns the socket; the registry only holds the sender
/// half of its command channel plus the connection id used to guard
/// unregistration against replacement races.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    conn_id: Uuid,
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl ConnectionHandle {
    pub fn new(conn_id: Uuid, tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { conn_id, tx }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Send a command; false means the session already went away
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Process-wide registry of live connections, at most one per identity
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the live connection for `user`.
    ///
    /// Any prior connection under the same identity is told to terminate
    /// and returned; after this call only the new handle is reachable.
    pub fn register(&self, user: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let conn_id = handle.conn_id;
        let prior = self.connections.insert(user, handle);
        if let Some(ref evicted) = prior {
            tracing::info!(
                user_id = %user,
                old_conn = %evicted.conn_id,
                new_conn = %conn_id,
                "replacing live connection for identity"
            );
            evicted.send(SessionCommand::Terminate);
        }
        prior
    }

    /// Remove the mapping only if `conn_id` still owns it.
    ///
    /// A session unregisters with its own connection id on the way out; if
    /// a newer connection has already replaced it, this is a no-op.
    pub fn unregister(&self, user: UserId, conn_id: Uuid) -> bool {
        self.connections
            .remove_if(&user, |_, handle| handle.conn_id == conn_id)
            .is_some()
    }

    /// Push a message to `user`'s live connection, if any.
    ///
    /// A miss is not an error; it means the peer is not currently online.
    pub fn deliver(&self, user: UserId, message: ServerMessage) -> bool {
        match self.connections.get(&user) {
            Some(handle) => handle.send(SessionCommand::Deliver(message)),
            None => false,
        }
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.connections.contains_key(&user)
    }

    /// Number of currently registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
