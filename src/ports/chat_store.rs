//! ChatStore port - transactional writes against the room store.
//!
//! Every mutating chat operation runs inside one [`ChatTransaction`]. Nothing
//! written through it is visible to readers until [`ChatTransaction::commit`]
//! succeeds; dropping an uncommitted transaction rolls it back.

use async_trait::async_trait;
use thiserror::Error;

use super::unread_counter::UnreadRecount;
use crate::domain::chat::{ChatError, Membership, Message, Participants, Room};
use crate::domain::foundation::{ListingId, MemberId, MembershipId, MessageId, RoomId, Timestamp};

/// Errors surfaced by the room store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (e.g. a second room for the
    /// same listing and guest).
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other integrity constraint rejected the write.
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::storage(err.to_string())
    }
}

/// A room about to be created together with both memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub listing_id: ListingId,
    pub host_id: MemberId,
    pub guest_id: MemberId,
    pub title_snapshot: String,
}

/// The result of inserting a room: the room and its two memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room: Room,
    pub host: Membership,
    pub guest: Membership,
}

/// A message about to be appended. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_membership_id: MembershipId,
    pub text: String,
}

/// Factory for chat transactions.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, StoreError>;
}

/// One open unit of work against the room store.
#[async_trait]
pub trait ChatTransaction: Send {
    /// Find the room for a (listing, guest) pair.
    async fn find_room_for_guest(
        &mut self,
        listing_id: ListingId,
        guest_id: MemberId,
    ) -> Result<Option<Room>, StoreError>;

    /// Insert a room and both memberships atomically.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when a room already exists
    /// for the pair. Implementations may report the violation here or from
    /// `commit`, depending on when their storage checks it.
    async fn insert_room(&mut self, room: NewRoom) -> Result<CreatedRoom, StoreError>;

    /// Both memberships of `room_id`, oriented around `member_id`.
    ///
    /// Returns `None` when the room does not exist or `member_id` is not a
    /// party to it.
    async fn find_participants(
        &mut self,
        room_id: RoomId,
        member_id: MemberId,
    ) -> Result<Option<Participants>, StoreError>;

    /// Append a message. The sender membership must belong to the room.
    async fn insert_message(&mut self, message: NewMessage) -> Result<Message, StoreError>;

    /// Refresh the room's last-message cache unless it holds a newer message.
    async fn update_last_message(
        &mut self,
        room_id: RoomId,
        text: &str,
        at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Largest message id in the room that is `<= upto`.
    async fn latest_message_at_or_before(
        &mut self,
        room_id: RoomId,
        upto: MessageId,
    ) -> Result<Option<MessageId>, StoreError>;

    /// Move a membership's read pointer to `to` if that is forward.
    ///
    /// Returns whether the pointer moved. Concurrent callers can never move
    /// it backward.
    async fn advance_read_pointer(
        &mut self,
        membership_id: MembershipId,
        to: MessageId,
    ) -> Result<bool, StoreError>;

    /// Unread count for a membership as this transaction sees it, including
    /// its own pointer moves.
    async fn count_unread(
        &mut self,
        membership_id: MembershipId,
    ) -> Result<UnreadRecount, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
