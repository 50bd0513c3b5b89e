//! GetRoomHandler - Room detail for one of its two members.

use std::sync::Arc;

use crate::application::UnreadTracker;
use crate::domain::chat::{ChatError, RoomDetail};
use crate::domain::foundation::{MemberId, RoomId};
use crate::ports::{ChatReader, MemberDirectory};

#[derive(Debug, Clone)]
pub struct GetRoomQuery {
    pub room_id: RoomId,
    pub requester_id: MemberId,
}

/// Handler for opening a room.
///
/// Opening a room recounts the caller's unread messages from the store and
/// writes the result back to the counter, repairing any drift. The write-back
/// carries the recount's watermarks, so increments still queued for counted
/// messages are skipped and an older recount never replaces a newer one.
pub struct GetRoomHandler {
    reader: Arc<dyn ChatReader>,
    members: Arc<dyn MemberDirectory>,
    tracker: UnreadTracker,
}

impl GetRoomHandler {
    pub fn new(
        reader: Arc<dyn ChatReader>,
        members: Arc<dyn MemberDirectory>,
        tracker: UnreadTracker,
    ) -> Self {
        Self {
            reader,
            members,
            tracker,
        }
    }

    pub async fn handle(&self, query: GetRoomQuery) -> Result<RoomDetail, ChatError> {
        let room = self
            .reader
            .find_room(query.room_id)
            .await?
            .ok_or(ChatError::RoomNotFound(query.room_id))?;
        let participants = self
            .reader
            .find_participants(query.room_id, query.requester_id)
            .await?
            .ok_or_else(|| ChatError::forbidden(query.room_id, query.requester_id))?;

        let other_id = participants.other.member_id();
        let other = self
            .members
            .find_profile(other_id)
            .await?
            .ok_or(ChatError::MemberNotFound(other_id))?;

        let recount = self.reader.count_unread(participants.me.id()).await?;
        if let Err(error) = self
            .tracker
            .reconcile(query.requester_id, query.room_id, recount)
            .await
        {
            tracing::warn!(room_id = %query.room_id, %error, "failed to write back unread recount");
        }

        Ok(RoomDetail::new(&room, &participants.me, other, recount.count))
    }
}
