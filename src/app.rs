//! Wiring of ports, handlers and transports into one router.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::http::{chat_routes, ChatHandlers};
use crate::adapters::websocket::{
    websocket_router, InMemoryConnectionRegistry, RegistryNotificationPublisher, RoomChannels,
    WebSocketState,
};
use crate::application::{
    AfterCommitRunner, CreateRoomHandler, GetRoomHandler, ListMessagesHandler, ListRoomsHandler,
    MarkReadHandler, SendMessageHandler, UnreadTracker,
};
use crate::config::{ChatConfig, ServerConfig};
use crate::ports::{
    ChatReader, ChatStore, ConnectionRegistry, ListingDirectory, MemberDirectory,
    NotificationPublisher, RoomMessagePublisher, UnreadCounter,
};

/// Storage-facing dependencies of the chat service.
#[derive(Clone)]
pub struct ChatBackends {
    pub store: Arc<dyn ChatStore>,
    pub reader: Arc<dyn ChatReader>,
    pub listings: Arc<dyn ListingDirectory>,
    pub members: Arc<dyn MemberDirectory>,
    pub counter: Arc<dyn UnreadCounter>,
}

/// Process-wide delivery components. Built once at startup.
#[derive(Clone)]
pub struct Delivery {
    pub runner: AfterCommitRunner,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub channels: Arc<RoomChannels>,
}

impl Delivery {
    pub fn new(runner: AfterCommitRunner, config: &ChatConfig) -> Self {
        Self {
            runner,
            registry: Arc::new(InMemoryConnectionRegistry::new()),
            channels: Arc::new(RoomChannels::new(config.room_channel_capacity)),
        }
    }
}

/// Build the chat API: REST under `/api/chats`, live connections under
/// `/members/:member_id/live`.
pub fn build_router(
    backends: ChatBackends,
    delivery: &Delivery,
    server: &ServerConfig,
    chat: &ChatConfig,
) -> Router {
    let tracker = UnreadTracker::new(backends.counter.clone());
    let notifications: Arc<dyn NotificationPublisher> =
        Arc::new(RegistryNotificationPublisher::new(delivery.registry.clone()));
    let rooms: Arc<dyn RoomMessagePublisher> = delivery.channels.clone();

    let handlers = ChatHandlers::new(
        Arc::new(CreateRoomHandler::new(
            backends.store.clone(),
            backends.reader.clone(),
            backends.listings.clone(),
            backends.members.clone(),
            notifications.clone(),
            delivery.runner.clone(),
        )),
        Arc::new(GetRoomHandler::new(
            backends.reader.clone(),
            backends.members.clone(),
            tracker.clone(),
        )),
        Arc::new(ListRoomsHandler::new(backends.reader.clone(), tracker.clone())),
        Arc::new(ListMessagesHandler::new(backends.reader.clone())),
        Arc::new(SendMessageHandler::new(
            backends.store.clone(),
            tracker.clone(),
            rooms,
            notifications,
            delivery.runner.clone(),
        )),
        Arc::new(MarkReadHandler::new(
            backends.store.clone(),
            tracker,
            delivery.runner.clone(),
        )),
    )
    .with_paging(chat);

    let live = websocket_router(WebSocketState {
        registry: delivery.registry.clone(),
        channels: delivery.channels.clone(),
        reader: backends.reader,
        push_buffer: chat.push_buffer,
        idle_timeout: chat.idle_timeout(),
    });

    let api = Router::new()
        .nest("/api/chats", chat_routes(handlers))
        .layer(TimeoutLayer::new(server.request_timeout()));

    Router::new()
        .merge(api)
        .merge(live)
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
