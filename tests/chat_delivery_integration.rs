//! End-to-end delivery tests over the in-memory adapters.
//!
//! These wire the real handlers to the real registry, room channels and
//! notification publisher, so every push observed here went through the
//! after-commit runner exactly as it does in production.

use std::sync::Arc;
use std::time::Duration;

use rental_chat::adapters::{
    InMemoryChatDatabase, InMemoryConnectionRegistry, InMemoryUnreadCounter,
    RegistryNotificationPublisher, RoomChannels,
};
use rental_chat::application::{
    AfterCommitRunner, CreateRoomCommand, CreateRoomHandler, ListRoomsHandler, ListRoomsQuery,
    MarkReadCommand, MarkReadHandler, SendMessageCommand, SendMessageHandler, UnreadTracker,
};
use rental_chat::domain::chat::{
    ChatError, ChatErrorKind, ChatNotification, MemberProfile, MessageView,
};
use rental_chat::domain::foundation::{ListingId, MemberId, PageRequest, RoomId};
use rental_chat::ports::{ConnectionRegistry, LiveConnection, PushReceiver};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Harness {
    db: Arc<InMemoryChatDatabase>,
    tracker: UnreadTracker,
    runner: AfterCommitRunner,
    registry: Arc<InMemoryConnectionRegistry>,
    channels: Arc<RoomChannels>,
    create: CreateRoomHandler,
    send: SendMessageHandler,
    mark_read: MarkReadHandler,
    list: ListRoomsHandler,
}

impl Harness {
    fn new() -> Self {
        let db = Arc::new(InMemoryChatDatabase::new());
        let tracker = UnreadTracker::new(Arc::new(InMemoryUnreadCounter::new()));
        let (runner, _worker) = AfterCommitRunner::spawn();
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let channels = Arc::new(RoomChannels::new(16));
        let notifications = Arc::new(RegistryNotificationPublisher::new(registry.clone()));

        Self {
            create: CreateRoomHandler::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                notifications.clone(),
                runner.clone(),
            ),
            send: SendMessageHandler::new(
                db.clone(),
                tracker.clone(),
                channels.clone(),
                notifications,
                runner.clone(),
            ),
            mark_read: MarkReadHandler::new(db.clone(), tracker.clone(), runner.clone()),
            list: ListRoomsHandler::new(db.clone(), tracker.clone()),
            db,
            tracker,
            runner,
            registry,
            channels,
        }
    }

    fn member(&self, nickname: &str) -> MemberProfile {
        self.db.add_member(nickname, None)
    }

    async fn connect(&self, member_id: MemberId) -> PushReceiver {
        let (connection, rx) = LiveConnection::open(member_id, 16);
        self.registry.register(connection).await.unwrap();
        rx
    }

    async fn open_room(&self, listing_id: ListingId, guest: MemberId) -> Result<RoomId, ChatError> {
        self.create
            .handle(CreateRoomCommand {
                listing_id,
                requester_id: guest,
            })
            .await
            .map(|result| result.room.id())
    }

    async fn say(
        &self,
        room_id: RoomId,
        sender_id: MemberId,
        text: &str,
    ) -> Result<MessageView, ChatError> {
        self.send
            .handle(SendMessageCommand {
                room_id,
                sender_id,
                text: text.to_string(),
            })
            .await
    }
}

async fn next_push(rx: &mut PushReceiver) -> ChatNotification {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("push not delivered in time")
        .expect("push channel closed")
}

// =============================================================================
// Scenario
// =============================================================================

#[tokio::test]
async fn host_and_guest_conversation() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Harbour view studio");
    let mut host_push = h.connect(host.id).await;

    // Guest opens the room; host hears about it.
    let room_id = h.open_room(listing.id, guest.id).await.unwrap();
    match next_push(&mut host_push).await {
        ChatNotification::NewRoom(payload) => {
            assert_eq!(payload.room_id, room_id);
            assert_eq!(payload.other_member.id, guest.id);
            assert_eq!(payload.unread_count, 0);
        }
        other => panic!("expected NEW_ROOM, got {:?}", other),
    }

    // Host is viewing the room when the guest writes.
    let mut viewing = h.channels.subscribe(room_id).await;
    let message = h.say(room_id, guest.id, "available?").await.unwrap();
    h.runner.flush().await;

    assert_eq!(h.tracker.count(host.id, room_id).await, 1);
    assert_eq!(h.tracker.count(guest.id, room_id).await, 0);
    assert_eq!(viewing.recv().await.unwrap(), message);
    match next_push(&mut host_push).await {
        ChatNotification::NewMessage(payload) => {
            assert_eq!(payload.message_id, message.id);
            assert_eq!(payload.sender_id, guest.id);
        }
        other => panic!("expected NEW_MESSAGE, got {:?}", other),
    }

    // Host reads it.
    h.mark_read
        .handle(MarkReadCommand {
            room_id,
            member_id: host.id,
            upto_message_id: message.id,
        })
        .await
        .unwrap();
    h.runner.flush().await;

    assert_eq!(h.tracker.count(host.id, room_id).await, 0);
}

// =============================================================================
// Room creation
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_yield_one_room() {
    let h = Arc::new(Harness::new());
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move { h.open_room(listing.id, guest.id).await }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }

    assert_eq!(h.db.room_count(), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test]
async fn owner_opening_own_listing_is_invalid() {
    let h = Harness::new();
    let host = h.member("host");
    let listing = h.db.add_listing(host.id, "Cabin");

    let err = h.open_room(listing.id, host.id).await.unwrap_err();

    assert_eq!(err.kind(), ChatErrorKind::InvalidRequest);
    assert_eq!(h.db.room_count(), 0);
}

// =============================================================================
// Fan-out
// =============================================================================

#[tokio::test]
async fn room_message_reaches_only_that_rooms_viewers() {
    let h = Harness::new();
    let host = h.member("host");
    let first_guest = h.member("first");
    let second_guest = h.member("second");
    let listing = h.db.add_listing(host.id, "Cabin");
    let first_room = h.open_room(listing.id, first_guest.id).await.unwrap();
    let second_room = h.open_room(listing.id, second_guest.id).await.unwrap();

    let mut first_viewer = h.channels.subscribe(first_room).await;
    let mut second_viewer = h.channels.subscribe(second_room).await;

    h.say(first_room, first_guest.id, "hello").await.unwrap();
    h.runner.flush().await;

    assert!(first_viewer.try_recv().is_ok());
    assert!(first_viewer.try_recv().is_err());
    assert!(second_viewer.try_recv().is_err());
}

#[tokio::test]
async fn offline_recipient_catches_up_through_counter() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let room_id = h.open_room(listing.id, guest.id).await.unwrap();

    h.say(room_id, guest.id, "one").await.unwrap();
    h.say(room_id, guest.id, "two").await.unwrap();
    h.runner.flush().await;

    let page = h
        .list
        .handle(ListRoomsQuery {
            member_id: host.id,
            page: PageRequest::default(),
            keyword: None,
        })
        .await
        .unwrap();
    assert_eq!(page.content[0].unread_count, 2);
    assert_eq!(page.content[0].last_message.as_deref(), Some("two"));
}

#[tokio::test]
async fn unread_stays_exact_when_read_and_send_effects_queue_together() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let room_id = h.open_room(listing.id, guest.id).await.unwrap();

    let first = h.say(room_id, guest.id, "one").await.unwrap();
    h.runner.flush().await;
    h.mark_read
        .handle(MarkReadCommand {
            room_id,
            member_id: host.id,
            upto_message_id: first.id,
        })
        .await
        .unwrap();
    h.say(room_id, guest.id, "two").await.unwrap();
    h.runner.flush().await;

    assert_eq!(h.tracker.count(host.id, room_id).await, 1);
}

#[tokio::test]
async fn every_connection_of_recipient_gets_the_push() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let mut phone = h.connect(host.id).await;
    let mut laptop = h.connect(host.id).await;

    h.open_room(listing.id, guest.id).await.unwrap();

    assert_eq!(next_push(&mut phone).await.kind(), "NEW_ROOM");
    assert_eq!(next_push(&mut laptop).await.kind(), "NEW_ROOM");
}

#[tokio::test]
async fn disconnected_connection_is_pruned_on_push() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let gone = h.connect(host.id).await;
    drop(gone);

    h.open_room(listing.id, guest.id).await.unwrap();
    h.runner.flush().await;

    assert_eq!(h.registry.connection_count().await, 0);
}

// =============================================================================
// Commit gating
// =============================================================================

#[tokio::test]
async fn rejected_message_fires_no_effects() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let room_id = h.open_room(listing.id, guest.id).await.unwrap();
    let mut host_push = h.connect(host.id).await;
    let mut viewing = h.channels.subscribe(room_id).await;

    let err = h.say(room_id, guest.id, &"x".repeat(5001)).await.unwrap_err();
    h.runner.flush().await;

    assert!(matches!(err, ChatError::ValidationFailed { .. }));
    assert_eq!(h.db.message_count(), 0);
    assert_eq!(h.tracker.count(host.id, room_id).await, 0);
    assert!(viewing.try_recv().is_err());
    assert!(host_push.try_recv().is_err());
}

#[tokio::test]
async fn messages_reach_viewer_in_commit_order() {
    let h = Harness::new();
    let host = h.member("host");
    let guest = h.member("guest");
    let listing = h.db.add_listing(host.id, "Cabin");
    let room_id = h.open_room(listing.id, guest.id).await.unwrap();
    let mut viewing = h.channels.subscribe(room_id).await;

    let mut sent = Vec::new();
    for i in 0..10 {
        let sender = if i % 2 == 0 { guest.id } else { host.id };
        sent.push(h.say(room_id, sender, &format!("m{}", i)).await.unwrap().id);
    }
    h.runner.flush().await;

    let mut received = Vec::new();
    while let Ok(message) = viewing.try_recv() {
        received.push(message.id);
    }
    assert_eq!(received, sent);
}

// =============================================================================
// Paging
// =============================================================================

#[tokio::test]
async fn three_rooms_page_by_two() {
    let h = Harness::new();
    let host = h.member("host");
    let listing = h.db.add_listing(host.id, "Cabin");
    for name in ["a", "b", "c"] {
        let guest = h.member(name);
        h.open_room(listing.id, guest.id).await.unwrap();
    }

    let query = |page| ListRoomsQuery {
        member_id: host.id,
        page: PageRequest::new(page, 2).unwrap(),
        keyword: None,
    };
    let first = h.list.handle(query(0)).await.unwrap();
    let second = h.list.handle(query(1)).await.unwrap();

    assert_eq!((first.content.len(), first.total_elements), (2, 3));
    assert_eq!((second.content.len(), second.total_elements), (1, 3));
}
