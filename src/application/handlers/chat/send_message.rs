//! SendMessageHandler - Append a message and fan it out after commit.

use std::sync::Arc;

use crate::application::{AfterCommitRunner, EffectError, TransactionScope, UnreadTracker};
use crate::domain::chat::{ChatError, ChatNotification, MessageText, MessageView};
use crate::domain::foundation::{MemberId, RoomId};
use crate::ports::{
    ChatStore, NewMessage, NotificationPublisher, RoomMessagePublisher, StoreError,
};

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub room_id: RoomId,
    pub sender_id: MemberId,
    pub text: String,
}

/// Handler for appending messages.
///
/// After the message commits, in order: the recipient's unread counter is
/// incremented, the room's subscribers get the message, and the recipient
/// gets a `NEW_MESSAGE` notification.
pub struct SendMessageHandler {
    store: Arc<dyn ChatStore>,
    tracker: UnreadTracker,
    rooms: Arc<dyn RoomMessagePublisher>,
    notifications: Arc<dyn NotificationPublisher>,
    runner: AfterCommitRunner,
}

impl SendMessageHandler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        tracker: UnreadTracker,
        rooms: Arc<dyn RoomMessagePublisher>,
        notifications: Arc<dyn NotificationPublisher>,
        runner: AfterCommitRunner,
    ) -> Self {
        Self {
            store,
            tracker,
            rooms,
            notifications,
            runner,
        }
    }

    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<MessageView, ChatError> {
        let text = MessageText::parse(cmd.text)?;

        // Early returns drop the scope, which rolls the transaction back.
        let mut scope = TransactionScope::begin(self.store.as_ref(), &self.runner).await?;
        let participants = scope
            .tx()
            .find_participants(cmd.room_id, cmd.sender_id)
            .await?
            .ok_or_else(|| ChatError::forbidden(cmd.room_id, cmd.sender_id))?;

        let message = scope
            .tx()
            .insert_message(NewMessage {
                room_id: cmd.room_id,
                sender_membership_id: participants.me.id(),
                text: text.into_inner(),
            })
            .await
            .map_err(|e| match e {
                StoreError::ConstraintViolation(constraint) => {
                    ChatError::validation("text", format!("rejected by store: {}", constraint))
                }
                other => other.into(),
            })?;
        scope
            .tx()
            .update_last_message(cmd.room_id, &message.text, message.created_at)
            .await?;

        let view = MessageView::from_message(&message, cmd.sender_id);
        let recipient = participants.other.member_id();

        let tracker = self.tracker.clone();
        let (room_id, message_id) = (cmd.room_id, message.id);
        scope.run_after_commit("unread.increment", async move {
            tracker
                .increment(recipient, room_id, message_id)
                .await
                .map(drop)
                .map_err(EffectError::from)
        });

        let rooms = self.rooms.clone();
        let room_view = view.clone();
        scope.run_after_commit("room.publish", async move {
            rooms
                .publish(room_id, room_view)
                .await
                .map(drop)
                .map_err(EffectError::from)
        });

        let notifications = self.notifications.clone();
        let event = ChatNotification::new_message(&view);
        scope.run_after_commit("notify.new_message", async move {
            notifications
                .publish(recipient, event)
                .await
                .map(drop)
                .map_err(EffectError::from)
        });

        scope.commit().await?;

        tracing::debug!(
            room_id = %view.room_id,
            message_id = %view.id,
            sender_id = %view.sender_id,
            "message appended"
        );
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::super::create_room::{CreateRoomCommand, CreateRoomHandler};
    use super::super::test_support::{Fixture, RecordingNotificationPublisher};
    use super::*;
    use crate::domain::chat::{ChatErrorKind, MAX_MESSAGE_LENGTH};

    fn handler(f: &Fixture) -> SendMessageHandler {
        SendMessageHandler::new(
            f.db.clone(),
            f.tracker.clone(),
            f.rooms.clone(),
            f.notifications.clone(),
            f.runner.clone(),
        )
    }

    async fn open_room(f: &Fixture) -> RoomId {
        let created = CreateRoomHandler::new(
            f.db.clone(),
            f.db.clone(),
            f.db.clone(),
            f.db.clone(),
            f.notifications.clone(),
            f.runner.clone(),
        )
        .handle(CreateRoomCommand {
            listing_id: f.listing.id,
            requester_id: f.guest.id,
        })
        .await
        .unwrap();
        f.runner.flush().await;
        created.room.id()
    }

    fn send(room_id: RoomId, sender_id: MemberId, text: &str) -> SendMessageCommand {
        SendMessageCommand {
            room_id,
            sender_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn increments_recipient_unread_only() {
        let f = Fixture::new();
        let room = open_room(&f).await;

        handler(&f).handle(send(room, f.guest.id, "hi")).await.unwrap();
        f.runner.flush().await;

        assert_eq!(f.unread(f.host.id, room).await, 1);
        assert_eq!(f.unread(f.guest.id, room).await, 0);
        assert!(!f.has_counter(f.guest.id, room));
    }

    #[tokio::test]
    async fn returns_store_assigned_id_and_sender_member() {
        let f = Fixture::new();
        let room = open_room(&f).await;

        let first = handler(&f).handle(send(room, f.guest.id, "one")).await.unwrap();
        let second = handler(&f).handle(send(room, f.host.id, "two")).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.sender_id, f.guest.id);
        assert_eq!(second.sender_id, f.host.id);
        assert_eq!(f.db.message_count(), 2);
    }

    #[tokio::test]
    async fn publishes_to_room_then_notifies_recipient() {
        let f = Fixture::new();
        let room = open_room(&f).await;

        let view = handler(&f)
            .handle(send(room, f.guest.id, "available?"))
            .await
            .unwrap();
        f.runner.flush().await;

        assert_eq!(f.rooms.published(), vec![(room, view.clone())]);
        let notifications = f.notifications.published();
        let (recipient, event) = notifications.last().unwrap();
        assert_eq!(*recipient, f.host.id);
        assert_eq!(event, &ChatNotification::new_message(&view));
    }

    #[tokio::test]
    async fn non_participant_is_forbidden() {
        let f = Fixture::new();
        let room = open_room(&f).await;
        let stranger = f.db.add_member("stranger", None);

        let err = handler(&f)
            .handle(send(room, stranger.id, "hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ChatErrorKind::Forbidden);
        assert_eq!(f.db.message_count(), 0);
    }

    #[tokio::test]
    async fn missing_room_is_forbidden() {
        let f = Fixture::new();

        let err = handler(&f)
            .handle(send(RoomId::new(77), f.guest.id, "hello"))
            .await
            .unwrap_err();

        assert_eq!(err, ChatError::forbidden(RoomId::new(77), f.guest.id));
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let f = Fixture::new();
        let room = open_room(&f).await;

        let err = handler(&f).handle(send(room, f.guest.id, "  \n ")).await.unwrap_err();

        assert_eq!(err.kind(), ChatErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn store_constraint_rolls_back_without_effects() {
        let f = Fixture::new();
        let room = open_room(&f).await;
        let before = f.notifications.published().len();
        let too_long = "x".repeat(MAX_MESSAGE_LENGTH + 1);

        let err = handler(&f)
            .handle(send(room, f.guest.id, &too_long))
            .await
            .unwrap_err();
        f.runner.flush().await;

        assert!(matches!(err, ChatError::ValidationFailed { .. }));
        assert_eq!(f.db.message_count(), 0);
        assert!(f.rooms.published().is_empty());
        assert_eq!(f.notifications.published().len(), before);
        assert_eq!(f.unread(f.host.id, room).await, 0);
    }

    #[tokio::test]
    async fn push_failure_still_counts_unread() {
        let f = Fixture::with_notifications(RecordingNotificationPublisher::failing());
        let room = open_room(&f).await;

        handler(&f).handle(send(room, f.guest.id, "hi")).await.unwrap();
        f.runner.flush().await;

        assert_eq!(f.unread(f.host.id, room).await, 1);
        assert_eq!(f.rooms.published().len(), 1);
    }

    #[tokio::test]
    async fn counter_outage_does_not_fail_send() {
        let f = Fixture::new();
        let room = open_room(&f).await;
        f.counter.set_unavailable(true);

        let result = handler(&f).handle(send(room, f.guest.id, "hi")).await;
        f.runner.flush().await;

        assert!(result.is_ok());
        assert_eq!(f.rooms.published().len(), 1);
    }

    #[tokio::test]
    async fn updates_room_last_message() {
        let f = Fixture::new();
        let room = open_room(&f).await;

        handler(&f).handle(send(room, f.guest.id, "first")).await.unwrap();
        handler(&f).handle(send(room, f.host.id, "second")).await.unwrap();

        let room = crate::ports::ChatReader::find_room(f.db.as_ref(), room)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room.last_message().unwrap().text, "second");
    }
}
