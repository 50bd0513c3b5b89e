//! Per-room broadcast channels for live message delivery.
//!
//! Each room with at least one subscriber has one broadcast channel. A
//! message published to a room reaches only that room's subscribers.
//!
//! ```text
//! Room: 12             Room: 40
//! ├── conn-a           ├── conn-d
//! └── conn-b           └── conn-e
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::domain::chat::MessageView;
use crate::domain::foundation::RoomId;
use crate::ports::{PublishError, RoomMessagePublisher};

/// Room-scoped fan-out over tokio broadcast channels.
///
/// Uses `RwLock` for the channel map since publishes vastly outnumber
/// subscribes and releases.
pub struct RoomChannels {
    rooms: RwLock<HashMap<RoomId, broadcast::Sender<MessageView>>>,
    channel_capacity: usize,
}

impl RoomChannels {
    /// `channel_capacity` bounds how far a slow subscriber may lag before it
    /// starts missing messages.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Subscribe to a room, creating its channel on first use.
    pub async fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<MessageView> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe()
    }

    /// Drop the room's channel if nobody is subscribed anymore.
    ///
    /// Call after the subscriber's receiver has been dropped.
    pub async fn release(&self, room_id: RoomId) {
        let mut rooms = self.rooms.write().await;
        if rooms
            .get(&room_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            rooms.remove(&room_id);
        }
    }

    /// Number of subscribers currently in a room.
    pub async fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Rooms that currently have a channel.
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().copied().collect()
    }
}

impl Default for RoomChannels {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RoomMessagePublisher for RoomChannels {
    async fn publish(&self, room_id: RoomId, message: MessageView) -> Result<usize, PublishError> {
        let rooms = self.rooms.read().await;
        // A send error only means nobody is listening.
        Ok(rooms
            .get(&room_id)
            .and_then(|sender| sender.send(message).ok())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MemberId, MessageId, Timestamp};
    use std::time::Duration;

    fn message(room: i64, id: i64) -> MessageView {
        MessageView {
            id: MessageId::new(id),
            room_id: RoomId::new(room),
            sender_id: MemberId::new(1),
            text: format!("message {}", id),
            created_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_room_messages() {
        let channels = RoomChannels::default();
        let mut rx = channels.subscribe(RoomId::new(1)).await;

        let delivered = channels.publish(RoomId::new(1), message(1, 10)).await.unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap().id, MessageId::new(10));
    }

    #[tokio::test]
    async fn all_subscribers_of_a_room_receive() {
        let channels = RoomChannels::default();
        let mut rx1 = channels.subscribe(RoomId::new(1)).await;
        let mut rx2 = channels.subscribe(RoomId::new(1)).await;

        assert_eq!(channels.publish(RoomId::new(1), message(1, 1)).await.unwrap(), 2);
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn other_rooms_do_not_receive() {
        let channels = RoomChannels::default();
        let _rx1 = channels.subscribe(RoomId::new(1)).await;
        let mut rx2 = channels.subscribe(RoomId::new(2)).await;

        channels.publish(RoomId::new(1), message(1, 1)).await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(50), rx2.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let channels = RoomChannels::default();
        let delivered = channels.publish(RoomId::new(9), message(9, 1)).await.unwrap();
        assert_eq!(delivered, 0);
        assert!(channels.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn release_removes_empty_room() {
        let channels = RoomChannels::default();
        let rx = channels.subscribe(RoomId::new(1)).await;
        assert_eq!(channels.subscriber_count(RoomId::new(1)).await, 1);

        drop(rx);
        channels.release(RoomId::new(1)).await;

        assert!(channels.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn release_keeps_room_with_remaining_subscribers() {
        let channels = RoomChannels::default();
        let rx1 = channels.subscribe(RoomId::new(1)).await;
        let _rx2 = channels.subscribe(RoomId::new(1)).await;

        drop(rx1);
        channels.release(RoomId::new(1)).await;

        assert_eq!(channels.active_rooms().await, vec![RoomId::new(1)]);
        assert_eq!(channels.subscriber_count(RoomId::new(1)).await, 1);
    }
}
