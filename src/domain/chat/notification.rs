//! User-scoped push events.
//!
//! These cross into the push transport, so their JSON shape is part of the
//! public contract. Bump [`NOTIFICATION_VERSION`] on any breaking change.

use serde::{Deserialize, Serialize};

use super::room::Room;
use super::views::{ListingTitle, MemberProfile, MessageView};
use crate::domain::foundation::{MemberId, MessageId, RoomId, Timestamp};

pub const NOTIFICATION_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatNotification {
    NewRoom(NewRoomPayload),
    NewMessage(NewMessagePayload),
}

/// A room as first seen by its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoomPayload {
    pub room_id: RoomId,
    pub created_at: Timestamp,
    pub listing: ListingTitle,
    pub other_member: MemberProfile,
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub room_id: RoomId,
    pub message_id: MessageId,
    pub sender_id: MemberId,
    pub text: String,
    pub created_at: Timestamp,
}

impl ChatNotification {
    /// `NEW_ROOM` for the recipient, with `other_member` being the party they
    /// will be talking to.
    pub fn new_room(room: &Room, other_member: MemberProfile) -> Self {
        ChatNotification::NewRoom(NewRoomPayload {
            room_id: room.id(),
            created_at: room.created_at(),
            listing: ListingTitle {
                title: room.title_snapshot().to_string(),
            },
            other_member,
            unread_count: 0,
        })
    }

    pub fn new_message(message: &MessageView) -> Self {
        ChatNotification::NewMessage(NewMessagePayload {
            room_id: message.room_id,
            message_id: message.id,
            sender_id: message.sender_id,
            text: message.text.clone(),
            created_at: message.created_at,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChatNotification::NewRoom(_) => "NEW_ROOM",
            ChatNotification::NewMessage(_) => "NEW_MESSAGE",
        }
    }

    pub fn room_id(&self) -> RoomId {
        match self {
            ChatNotification::NewRoom(p) => p.room_id,
            ChatNotification::NewMessage(p) => p.room_id,
        }
    }
}
