//! Shared fixtures for chat handler tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::adapters::memory::InMemoryChatDatabase;
use crate::adapters::unread::InMemoryUnreadCounter;
use crate::application::{AfterCommitRunner, UnreadTracker};
use crate::domain::chat::{ChatNotification, ListingSnapshot, MemberProfile, MessageView};
use crate::domain::foundation::{MemberId, RoomId};
use crate::ports::{NotificationPublisher, PublishError, RoomMessagePublisher, UnreadKey};

#[derive(Default)]
pub struct RecordingRoomPublisher {
    published: Mutex<Vec<(RoomId, MessageView)>>,
}

impl RecordingRoomPublisher {
    pub fn published(&self) -> Vec<(RoomId, MessageView)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoomMessagePublisher for RecordingRoomPublisher {
    async fn publish(&self, room_id: RoomId, message: MessageView) -> Result<usize, PublishError> {
        self.published.lock().unwrap().push((room_id, message));
        Ok(1)
    }
}

#[derive(Default)]
pub struct RecordingNotificationPublisher {
    published: Mutex<Vec<(MemberId, ChatNotification)>>,
    fail: bool,
}

impl RecordingNotificationPublisher {
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<(MemberId, ChatNotification)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPublisher for RecordingNotificationPublisher {
    async fn publish(
        &self,
        recipient: MemberId,
        event: ChatNotification,
    ) -> Result<usize, PublishError> {
        if self.fail {
            return Err(PublishError::Transport("simulated push failure".to_string()));
        }
        self.published.lock().unwrap().push((recipient, event));
        Ok(1)
    }
}

/// A host with one listing and a prospective guest.
pub struct Fixture {
    pub db: Arc<InMemoryChatDatabase>,
    pub counter: Arc<InMemoryUnreadCounter>,
    pub tracker: UnreadTracker,
    pub runner: AfterCommitRunner,
    pub rooms: Arc<RecordingRoomPublisher>,
    pub notifications: Arc<RecordingNotificationPublisher>,
    pub host: MemberProfile,
    pub guest: MemberProfile,
    pub listing: ListingSnapshot,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_notifications(RecordingNotificationPublisher::default())
    }

    pub fn with_notifications(notifications: RecordingNotificationPublisher) -> Self {
        let db = Arc::new(InMemoryChatDatabase::new());
        let counter = Arc::new(InMemoryUnreadCounter::new());
        let (runner, _worker) = AfterCommitRunner::spawn();
        let host = db.add_member("host", Some("https://img.example/host.png"));
        let guest = db.add_member("guest", None);
        let listing = db.add_listing(host.id, "Sunny loft near the park");

        Self {
            tracker: UnreadTracker::new(counter.clone()),
            db,
            counter,
            runner,
            rooms: Arc::new(RecordingRoomPublisher::default()),
            notifications: Arc::new(notifications),
            host,
            guest,
            listing,
        }
    }

    pub async fn unread(&self, member_id: MemberId, room_id: RoomId) -> u64 {
        self.tracker.count(member_id, room_id).await
    }

    pub fn has_counter(&self, member_id: MemberId, room_id: RoomId) -> bool {
        self.counter.contains(UnreadKey::new(member_id, room_id))
    }
}
