//! Resilient view over the unread counter store.
//!
//! Reads never fail: an absent, unparsable or unreachable counter reads as
//! zero. Writes return their error so the after-commit runner can log it.

use std::sync::Arc;

use crate::domain::foundation::{MemberId, MessageId, RoomId};
use crate::ports::{UnreadCounter, UnreadCounterError, UnreadKey, UnreadRecount};

#[derive(Clone)]
pub struct UnreadTracker {
    counter: Arc<dyn UnreadCounter>,
}

impl UnreadTracker {
    pub fn new(counter: Arc<dyn UnreadCounter>) -> Self {
        Self { counter }
    }

    /// Current unread count, degrading to 0 on any counter failure.
    pub async fn count(&self, member_id: MemberId, room_id: RoomId) -> u64 {
        let key = UnreadKey::new(member_id, room_id);
        match self.counter.get(key).await {
            Ok(value) => value.unwrap_or(0),
            Err(UnreadCounterError::Corrupt { key, raw }) => {
                tracing::warn!(%key, %raw, "unparsable unread counter; reading as 0");
                0
            }
            Err(error) => {
                tracing::warn!(%key, %error, "unread counter unavailable; reading as 0");
                0
            }
        }
    }

    /// Count `message_id` as unread for `member_id`.
    pub async fn increment(
        &self,
        member_id: MemberId,
        room_id: RoomId,
        message_id: MessageId,
    ) -> Result<u64, UnreadCounterError> {
        self.counter
            .increment(UnreadKey::new(member_id, room_id), message_id)
            .await
    }

    /// Bring the counter in line with an authoritative recount.
    ///
    /// A room with nothing from the other party deletes the counter. Any other
    /// recount is stored with its watermarks, so increments it already covers
    /// are skipped and older recounts cannot overwrite it.
    pub async fn reconcile(
        &self,
        member_id: MemberId,
        room_id: RoomId,
        recount: UnreadRecount,
    ) -> Result<(), UnreadCounterError> {
        let key = UnreadKey::new(member_id, room_id);
        if recount.count == 0 && recount.through.is_none() {
            return self.counter.clear(key).await;
        }
        if !self.counter.reconcile(key, recount).await? {
            tracing::debug!(%key, count = recount.count, "stale recount ignored");
        }
        Ok(())
    }
}
