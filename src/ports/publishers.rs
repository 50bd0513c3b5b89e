//! Fan-out publisher ports.
//!
//! Both publishers are best-effort and never block on the recipient: a
//! recipient with nothing listening simply misses the event and catches up
//! through the unread counter and room list.

use async_trait::async_trait;

use crate::domain::chat::{ChatNotification, MessageView};
use crate::domain::foundation::{MemberId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Push transport failed: {0}")]
    Transport(String),

    #[error("Failed to encode push payload: {0}")]
    Encoding(String),
}

/// Delivers messages to everyone currently viewing a room.
#[async_trait]
pub trait RoomMessagePublisher: Send + Sync {
    /// Returns the number of subscribers the message was handed to.
    async fn publish(&self, room_id: RoomId, message: MessageView) -> Result<usize, PublishError>;
}

/// Delivers user-scoped events to every live connection of a recipient.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Returns the number of connections the event was handed to.
    async fn publish(
        &self,
        recipient: MemberId,
        event: ChatNotification,
    ) -> Result<usize, PublishError>;
}
