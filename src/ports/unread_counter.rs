//! UnreadCounter port - fast per-(recipient, room) counters.
//!
//! The counter is a cache of the authoritative unread state held by the room
//! store. It may lag or drift; callers must treat it as advisory.
//!
//! Increments and recounts can reach the counter in either order, so every
//! counter remembers the recount it was last set from. An increment for a
//! message that recount already saw is not counted again, and a recount taken
//! against older state than the stored one is refused.

use async_trait::async_trait;
use std::fmt;

use crate::domain::foundation::{MemberId, MessageId, RoomId};

/// Identifies one recipient's counter for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnreadKey {
    pub member_id: MemberId,
    pub room_id: RoomId,
}

impl UnreadKey {
    pub fn new(member_id: MemberId, room_id: RoomId) -> Self {
        Self { member_id, room_id }
    }

    /// Key name in the counter store.
    pub fn to_redis_key(&self) -> String {
        format!("unread:{}:{}", self.member_id, self.room_id)
    }
}

impl fmt::Display for UnreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member {} room {}", self.member_id, self.room_id)
    }
}

/// Authoritative unread count and the room state it was counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnreadRecount {
    pub count: u64,
    /// The member's read pointer when counted.
    pub read_upto: Option<MessageId>,
    /// Newest message in the room when counted.
    pub through: Option<MessageId>,
}

impl UnreadRecount {
    /// Whether `message_id` was already in the room when this was counted.
    pub fn covers(&self, message_id: MessageId) -> bool {
        self.through.is_some_and(|through| message_id <= through)
    }

    /// Whether this recount saw at least the state `other` saw.
    pub fn supersedes(&self, other: &UnreadRecount) -> bool {
        self.read_upto >= other.read_upto && self.through >= other.through
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnreadCounterError {
    /// The counter store could not be reached or rejected the command.
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    /// The stored value is not a non-negative integer.
    #[error("Counter {key} holds unparsable value {raw:?}")]
    Corrupt { key: String, raw: String },
}

#[async_trait]
pub trait UnreadCounter: Send + Sync {
    /// Atomically add one for `message_id`, creating the counter at 1 when
    /// absent. A message the stored recount covers leaves the value as is.
    /// Returns the value after the call.
    async fn increment(
        &self,
        key: UnreadKey,
        message_id: MessageId,
    ) -> Result<u64, UnreadCounterError>;

    /// Current value, `None` when the counter is absent.
    async fn get(&self, key: UnreadKey) -> Result<Option<u64>, UnreadCounterError>;

    /// Atomically replace the counter with `recount` unless the stored recount
    /// was taken against newer state. Returns whether it was applied.
    async fn reconcile(
        &self,
        key: UnreadKey,
        recount: UnreadRecount,
    ) -> Result<bool, UnreadCounterError>;

    /// Delete the counter. Deleting an absent counter is not an error.
    async fn clear(&self, key: UnreadKey) -> Result<(), UnreadCounterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_key_is_member_then_room() {
        let key = UnreadKey::new(MemberId::new(12), RoomId::new(34));
        assert_eq!(key.to_redis_key(), "unread:12:34");
    }

    fn recount(read_upto: Option<i64>, through: Option<i64>) -> UnreadRecount {
        UnreadRecount {
            count: 0,
            read_upto: read_upto.map(MessageId::new),
            through: through.map(MessageId::new),
        }
    }

    #[test]
    fn recount_covers_messages_up_to_through() {
        let seen = recount(None, Some(5));

        assert!(seen.covers(MessageId::new(5)));
        assert!(!seen.covers(MessageId::new(6)));
        assert!(!recount(None, None).covers(MessageId::new(1)));
    }

    #[test]
    fn newer_pointer_or_newer_messages_supersede() {
        let stored = recount(Some(3), Some(5));

        assert!(recount(Some(3), Some(5)).supersedes(&stored));
        assert!(recount(Some(4), Some(7)).supersedes(&stored));
        assert!(!recount(Some(2), Some(9)).supersedes(&stored));
        assert!(!recount(Some(5), Some(4)).supersedes(&stored));
        assert!(recount(None, Some(1)).supersedes(&UnreadRecount::default()));
    }
}
