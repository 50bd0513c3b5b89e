//! MarkReadHandler - Advance a member's read pointer.

use std::sync::Arc;

use crate::application::{AfterCommitRunner, EffectError, TransactionScope, UnreadTracker};
use crate::domain::chat::ChatError;
use crate::domain::foundation::{MemberId, MessageId, RoomId};
use crate::ports::ChatStore;

#[derive(Debug, Clone)]
pub struct MarkReadCommand {
    pub room_id: RoomId,
    pub member_id: MemberId,
    /// Everything up to and including this message has been read.
    pub upto_message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkReadResult {
    /// Whether the pointer moved.
    pub advanced: bool,
    /// The pointer after the call.
    pub last_read_message_id: Option<MessageId>,
}

/// Handler for read tracking.
///
/// The pointer only moves forward. A stale or foreign `upto_message_id` is a
/// no-op, not an error. An advance recounts the member's unread messages in
/// the same transaction, and the counter is reconciled to that recount once
/// it commits. Increments still queued for messages the recount already saw
/// are then skipped.
pub struct MarkReadHandler {
    store: Arc<dyn ChatStore>,
    tracker: UnreadTracker,
    runner: AfterCommitRunner,
}

impl MarkReadHandler {
    pub fn new(store: Arc<dyn ChatStore>, tracker: UnreadTracker, runner: AfterCommitRunner) -> Self {
        Self {
            store,
            tracker,
            runner,
        }
    }

    pub async fn handle(&self, cmd: MarkReadCommand) -> Result<MarkReadResult, ChatError> {
        let mut scope = TransactionScope::begin(self.store.as_ref(), &self.runner).await?;
        let me = scope
            .tx()
            .find_participants(cmd.room_id, cmd.member_id)
            .await?
            .ok_or_else(|| ChatError::forbidden(cmd.room_id, cmd.member_id))?
            .me;

        // Clamp to a message that exists in this room.
        let target = scope
            .tx()
            .latest_message_at_or_before(cmd.room_id, cmd.upto_message_id)
            .await?;
        let target = match target {
            Some(target) if me.is_behind(target) => target,
            _ => {
                scope.rollback().await?;
                return Ok(MarkReadResult {
                    advanced: false,
                    last_read_message_id: me.last_read_message_id(),
                });
            }
        };

        let advanced = scope.tx().advance_read_pointer(me.id(), target).await?;
        if advanced {
            let recount = scope.tx().count_unread(me.id()).await?;
            let tracker = self.tracker.clone();
            let (member_id, room_id) = (cmd.member_id, cmd.room_id);
            scope.run_after_commit("unread.reconcile", async move {
                tracker
                    .reconcile(member_id, room_id, recount)
                    .await
                    .map_err(EffectError::from)
            });
        }
        scope.commit().await?;

        if advanced {
            tracing::debug!(
                room_id = %cmd.room_id,
                member_id = %cmd.member_id,
                last_read_message_id = %target,
                "read pointer advanced"
            );
        }
        Ok(MarkReadResult {
            advanced,
            last_read_message_id: Some(target),
        })
    }
}
