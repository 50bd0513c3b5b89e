//! Room and membership entities.
//!
//! A room binds exactly one listing to exactly one guest. Its two memberships
//! (host and guest) are created with it and never change afterwards; the only
//! mutable state is the room's last-message cache and each membership's read
//! pointer.

use serde::Serialize;

use crate::domain::foundation::{ListingId, MemberId, MembershipId, MessageId, RoomId, Timestamp};

/// Denormalized copy of a room's newest message, kept for list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub at: Timestamp,
}

/// Two-party conversation bound to a listing.
///
/// # Invariants
///
/// - at most one room exists per `(listing_id, guest_id)`
/// - `title_snapshot` is the listing title at creation and never follows
///   later listing edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: RoomId,
    listing_id: ListingId,
    guest_id: MemberId,
    title_snapshot: String,
    created_at: Timestamp,
    last_message: Option<LastMessage>,
}

impl Room {
    /// Reconstitute a room from persistence.
    pub fn reconstitute(
        id: RoomId,
        listing_id: ListingId,
        guest_id: MemberId,
        title_snapshot: String,
        created_at: Timestamp,
        last_message: Option<LastMessage>,
    ) -> Self {
        Self {
            id,
            listing_id,
            guest_id,
            title_snapshot,
            created_at,
            last_message,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn guest_id(&self) -> MemberId {
        self.guest_id
    }

    pub fn title_snapshot(&self) -> &str {
        &self.title_snapshot
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_message(&self) -> Option<&LastMessage> {
        self.last_message.as_ref()
    }

    /// Time used to order room lists: newest message, else creation.
    pub fn activity_at(&self) -> Timestamp {
        self.last_message
            .as_ref()
            .map(|m| m.at)
            .unwrap_or(self.created_at)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the last-message cache unless it already holds a newer message.
    ///
    /// Returns whether the cache changed.
    pub fn record_message(&mut self, text: impl Into<String>, at: Timestamp) -> bool {
        if let Some(current) = &self.last_message {
            if current.at.is_after(&at) {
                return false;
            }
        }
        self.last_message = Some(LastMessage {
            text: text.into(),
            at,
        });
        true
    }
}

/// One party's record within a room, carrying its read pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    id: MembershipId,
    room_id: RoomId,
    member_id: MemberId,
    last_read_message_id: Option<MessageId>,
}

impl Membership {
    pub fn reconstitute(
        id: MembershipId,
        room_id: RoomId,
        member_id: MemberId,
        last_read_message_id: Option<MessageId>,
    ) -> Self {
        Self {
            id,
            room_id,
            member_id,
            last_read_message_id,
        }
    }

    pub fn id(&self) -> MembershipId {
        self.id
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn last_read_message_id(&self) -> Option<MessageId> {
        self.last_read_message_id
    }

    /// Whether moving the pointer to `to` would move it forward.
    pub fn is_behind(&self, to: MessageId) -> bool {
        self.last_read_message_id.map_or(true, |current| current < to)
    }

    /// Move the read pointer forward to `to`.
    ///
    /// The pointer never moves backward: returns `false` and leaves the
    /// pointer untouched when `to` is not ahead of it.
    pub fn advance_read_pointer(&mut self, to: MessageId) -> bool {
        if !self.is_behind(to) {
            return false;
        }
        self.last_read_message_id = Some(to);
        true
    }
}

/// Both memberships of a room, seen from one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    pub me: Membership,
    pub other: Membership,
}

impl Participants {
    /// Orient a room's two memberships around `member`.
    ///
    /// Returns `None` when `member` holds neither membership.
    pub fn for_member(member: MemberId, first: Membership, second: Membership) -> Option<Self> {
        if first.member_id() == member {
            Some(Self {
                me: first,
                other: second,
            })
        } else if second.member_id() == member {
            Some(Self {
                me: second,
                other: first,
            })
        } else {
            None
        }
    }
}
