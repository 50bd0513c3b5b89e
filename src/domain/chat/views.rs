//! Read models returned by the chat queries.
//!
//! These are what clients see, so they serialize in camelCase and carry the
//! other member's profile as it is at read time. The listing title is the
//! snapshot taken when the room was created.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::room::{Membership, Room};
use crate::domain::foundation::{ListingId, MemberId, MessageId, RoomId, Timestamp};

/// Public profile of a marketplace member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub id: MemberId,
    pub nickname: String,
    pub avatar_url: Option<String>,
}

/// What the listing collaborator tells us about a listing at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSnapshot {
    pub id: ListingId,
    pub owner_id: MemberId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTitle {
    pub title: String,
}

/// A message as delivered to clients: the sender is a member, not a membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: MemberId,
    pub text: String,
    pub created_at: Timestamp,
}

impl MessageView {
    pub fn from_message(message: &Message, sender_id: MemberId) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id,
            text: message.text.clone(),
            created_at: message.created_at,
        }
    }
}

/// One row of a member's room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub listing_id: ListingId,
    pub created_at: Timestamp,
    pub listing: ListingTitle,
    pub other_member: MemberProfile,
    pub last_message: Option<String>,
    pub last_message_time: Option<Timestamp>,
    pub unread_count: u64,
}

impl RoomSummary {
    pub fn new(room: &Room, other_member: MemberProfile, unread_count: u64) -> Self {
        let last = room.last_message();
        Self {
            id: room.id(),
            listing_id: room.listing_id(),
            created_at: room.created_at(),
            listing: ListingTitle {
                title: room.title_snapshot().to_string(),
            },
            other_member,
            last_message: last.map(|m| m.text.clone()),
            last_message_time: last.map(|m| m.at),
            unread_count,
        }
    }
}

/// A single room as opened by one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetail {
    pub id: RoomId,
    pub listing_id: ListingId,
    pub created_at: Timestamp,
    pub listing: ListingTitle,
    pub other_member: MemberProfile,
    pub last_message: Option<String>,
    pub last_message_time: Option<Timestamp>,
    pub last_read_message_id: Option<MessageId>,
    pub unread_count: u64,
}

impl RoomDetail {
    pub fn new(room: &Room, me: &Membership, other_member: MemberProfile, unread_count: u64) -> Self {
        let summary = RoomSummary::new(room, other_member, unread_count);
        Self {
            id: summary.id,
            listing_id: summary.listing_id,
            created_at: summary.created_at,
            listing: summary.listing,
            other_member: summary.other_member,
            last_message: summary.last_message,
            last_message_time: summary.last_message_time,
            last_read_message_id: me.last_read_message_id(),
            unread_count,
        }
    }
}
