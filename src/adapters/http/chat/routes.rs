//! HTTP routes for chat endpoints.

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{
    create_room, get_room, list_messages, list_rooms, mark_read, send_message, ChatHandlers,
};

/// Creates the chat router, to be nested under `/api/chats`.
pub fn chat_routes(handlers: ChatHandlers) -> Router {
    Router::new()
        .route("/", post(create_room).get(list_rooms))
        .route("/:room_id", get(get_room))
        .route("/:room_id/messages", get(list_messages).post(send_message))
        .route("/:room_id/read", patch(mark_read))
        .with_state(handlers)
}
