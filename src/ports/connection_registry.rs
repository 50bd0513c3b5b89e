//! ConnectionRegistry port - which recipients have live push connections.
//!
//! The registry is process-local: it only knows the connections accepted by
//! this process. A multi-process deployment would put a broker in front of
//! per-process registries behind this same trait.
//!
//! ## Lifecycle
//!
//! 1. The transport accepts a socket and calls [`LiveConnection::open`]
//! 2. It registers the connection and keeps the [`PushReceiver`]
//! 3. The notification publisher pushes into every registered connection
//! 4. On any disconnect path the transport unregisters; dropping the
//!    receiver moves the connection to [`ConnectionState::Closed`]

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::chat::ChatNotification;
use crate::domain::foundation::{MemberId, Timestamp};

/// Identifies one live connection. Never reused: a reconnect gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Open -> Closed`, terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Result of handing one event to one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The connection's buffer is full; the event was dropped for it.
    Full,
    /// The transport side has gone away.
    Closed,
}

pub type PushReceiver = mpsc::Receiver<ChatNotification>;

/// Sending half of a live push connection.
#[derive(Debug, Clone)]
pub struct LiveConnection {
    id: ConnectionId,
    member_id: MemberId,
    opened_at: Timestamp,
    sender: mpsc::Sender<ChatNotification>,
}

impl LiveConnection {
    /// Open a connection for `member_id` with room for `buffer` pending events.
    pub fn open(member_id: MemberId, buffer: usize) -> (Self, PushReceiver) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let connection = Self {
            id: ConnectionId::new(),
            member_id,
            opened_at: Timestamp::now(),
            sender,
        };
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    pub fn state(&self) -> ConnectionState {
        if self.sender.is_closed() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Hand an event to the connection without waiting.
    pub fn push(&self, event: ChatNotification) -> PushOutcome {
        match self.sender.try_send(event) {
            Ok(()) => PushOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => PushOutcome::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }
}

/// Proof of registration, used to unregister on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub member_id: MemberId,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionRegistryError {
    #[error("Connection registry unavailable: {0}")]
    Unavailable(String),
}

/// Port for tracking live push connections.
///
/// All operations are safe under concurrent use without caller-side locking.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Add a connection. Registering an id that is already present keeps the
    /// existing entry.
    async fn register(
        &self,
        connection: LiveConnection,
    ) -> Result<Registration, ConnectionRegistryError>;

    /// Remove a connection. Removing an absent connection is a no-op that
    /// returns `false`.
    async fn unregister(
        &self,
        member_id: MemberId,
        connection_id: ConnectionId,
    ) -> Result<bool, ConnectionRegistryError>;

    /// Snapshot of the recipient's connections. Later registrations or
    /// removals do not affect a snapshot already taken.
    async fn list_connections(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<LiveConnection>, ConnectionRegistryError>;
}
