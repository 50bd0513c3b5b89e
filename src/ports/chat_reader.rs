//! ChatReader port - read-only queries against committed room store state.

use async_trait::async_trait;

use super::chat_store::StoreError;
use super::unread_counter::UnreadRecount;
use crate::domain::chat::{MemberProfile, MessageView, Participants, Room};
use crate::domain::foundation::{ListingId, MemberId, MembershipId, Page, PageRequest, RoomId};

/// A room in a member's list together with the other member's current profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListEntry {
    pub room: Room,
    pub other_member: MemberProfile,
}

#[async_trait]
pub trait ChatReader: Send + Sync {
    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError>;

    async fn find_room_for_guest(
        &self,
        listing_id: ListingId,
        guest_id: MemberId,
    ) -> Result<Option<Room>, StoreError>;

    async fn find_participants(
        &self,
        room_id: RoomId,
        member_id: MemberId,
    ) -> Result<Option<Participants>, StoreError>;

    /// Rooms containing `member_id`, newest activity first.
    ///
    /// `keyword` matches case-insensitively against the listing title
    /// snapshot or the other member's nickname.
    async fn list_rooms(
        &self,
        member_id: MemberId,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<RoomListEntry>, StoreError>;

    /// A room's messages, newest first.
    async fn list_messages(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> Result<Page<MessageView>, StoreError>;

    /// Authoritative unread count for a membership: messages in its room sent
    /// by the other party with an id above its read pointer. A missing
    /// membership counts as an empty room.
    async fn count_unread(&self, membership_id: MembershipId) -> Result<UnreadRecount, StoreError>;
}
