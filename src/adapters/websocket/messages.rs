//! WebSocket frame types for live chat connections.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, notifications, room messages,
//!   subscription acks, errors, pongs
//! - Client → Server: pings, room subscribe/unsubscribe

use serde::{Deserialize, Serialize};

use crate::domain::chat::{ChatNotification, MessageView, NOTIFICATION_VERSION};
use crate::domain::foundation::{MemberId, RoomId, Timestamp};
use crate::ports::ConnectionId;

// ============================================
// Server → Client Messages
// ============================================

/// All frames the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection registered.
    Connected(ConnectedMessage),

    /// User-scoped event for this member.
    #[serde(rename = "chat.notification")]
    Notification(NotificationMessage),

    /// New message in a subscribed room.
    #[serde(rename = "chat.message")]
    RoomMessage(RoomMessageFrame),

    Subscribed(SubscriptionMessage),

    Unsubscribed(SubscriptionMessage),

    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub member_id: MemberId,
    pub connection_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub version: u16,
    pub notification: ChatNotification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessageFrame {
    pub version: u16,
    pub room_id: RoomId,
    pub message: MessageView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn connected(member_id: MemberId, connection_id: ConnectionId) -> Self {
        ServerMessage::Connected(ConnectedMessage {
            member_id,
            connection_id: connection_id.to_string(),
            timestamp: now_rfc3339(),
        })
    }

    pub fn notification(notification: ChatNotification) -> Self {
        ServerMessage::Notification(NotificationMessage {
            version: NOTIFICATION_VERSION,
            notification,
        })
    }

    pub fn room_message(message: MessageView) -> Self {
        ServerMessage::RoomMessage(RoomMessageFrame {
            version: NOTIFICATION_VERSION,
            room_id: message.room_id,
            message,
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: now_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: now_rfc3339(),
        })
    }
}

fn now_rfc3339() -> String {
    Timestamp::now().as_datetime().to_rfc3339()
}

// ============================================
// Client → Server Messages
// ============================================

/// All frames accepted from the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,

    /// Start receiving `chat.message` frames for a room.
    #[serde(rename_all = "camelCase")]
    Subscribe { room_id: RoomId },

    #[serde(rename_all = "camelCase")]
    Unsubscribe { room_id: RoomId },
}
