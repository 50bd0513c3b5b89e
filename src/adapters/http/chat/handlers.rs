//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::middleware::RequireMember;
use crate::application::{
    CreateRoomCommand, CreateRoomHandler, GetRoomHandler, GetRoomQuery, ListMessagesHandler,
    ListMessagesQuery, ListRoomsHandler, ListRoomsQuery, MarkReadCommand, MarkReadHandler,
    SendMessageCommand, SendMessageHandler,
};
use crate::config::ChatConfig;
use crate::domain::chat::{ChatError, ChatErrorKind};
use crate::domain::foundation::{PageRequest, RoomId};

use super::dto::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, MarkReadRequest, MarkReadResponse,
    PageParams, SendMessageRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ChatHandlers {
    create_handler: Arc<CreateRoomHandler>,
    get_handler: Arc<GetRoomHandler>,
    list_handler: Arc<ListRoomsHandler>,
    messages_handler: Arc<ListMessagesHandler>,
    send_handler: Arc<SendMessageHandler>,
    mark_read_handler: Arc<MarkReadHandler>,
    default_page_size: u32,
    max_page_size: u32,
}

impl ChatHandlers {
    pub fn new(
        create_handler: Arc<CreateRoomHandler>,
        get_handler: Arc<GetRoomHandler>,
        list_handler: Arc<ListRoomsHandler>,
        messages_handler: Arc<ListMessagesHandler>,
        send_handler: Arc<SendMessageHandler>,
        mark_read_handler: Arc<MarkReadHandler>,
    ) -> Self {
        Self {
            create_handler,
            get_handler,
            list_handler,
            messages_handler,
            send_handler,
            mark_read_handler,
            default_page_size: PageRequest::DEFAULT_SIZE,
            max_page_size: PageRequest::MAX_SIZE,
        }
    }

    /// Apply the configured page size limits.
    pub fn with_paging(mut self, config: &ChatConfig) -> Self {
        self.default_page_size = config.default_page_size;
        self.max_page_size = config.max_page_size;
        self
    }

    fn page_request(&self, params: &PageParams) -> Result<PageRequest, Response> {
        PageRequest::bounded(
            params.page.unwrap_or(0),
            params.size.unwrap_or(self.default_page_size),
            self.max_page_size,
        )
        .map_err(|e| bad_request(e.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/chats - Create or get the room for a listing
pub async fn create_room(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Json(req): Json<CreateRoomRequest>,
) -> Response {
    let cmd = CreateRoomCommand {
        listing_id: req.listing_id,
        requester_id: member_id,
    };

    match handlers.create_handler.handle(cmd).await {
        Ok(result) => {
            let status = if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(CreateRoomResponse::from(result))).into_response()
        }
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chats - List the caller's rooms
pub async fn list_rooms(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Query(params): Query<PageParams>,
) -> Response {
    let page = match handlers.page_request(&params) {
        Ok(page) => page,
        Err(response) => return response,
    };
    let query = ListRoomsQuery {
        member_id,
        page,
        keyword: params.keyword,
    };

    match handlers.list_handler.handle(query).await {
        Ok(rooms) => (StatusCode::OK, Json(rooms)).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chats/:room_id - Room detail
pub async fn get_room(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Path(room_id): Path<String>,
) -> Response {
    let room_id = match parse_room_id(&room_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let query = GetRoomQuery {
        room_id,
        requester_id: member_id,
    };

    match handlers.get_handler.handle(query).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// GET /api/chats/:room_id/messages - Message history, newest first
pub async fn list_messages(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Path(room_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    let room_id = match parse_room_id(&room_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let page = match handlers.page_request(&params) {
        Ok(page) => page,
        Err(response) => return response,
    };
    let query = ListMessagesQuery {
        room_id,
        member_id,
        page,
    };

    match handlers.messages_handler.handle(query).await {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// POST /api/chats/:room_id/messages - Send a message
pub async fn send_message(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Path(room_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let room_id = match parse_room_id(&room_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let cmd = SendMessageCommand {
        room_id,
        sender_id: member_id,
        text: req.text,
    };

    match handlers.send_handler.handle(cmd).await {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

/// PATCH /api/chats/:room_id/read - Advance the caller's read pointer
pub async fn mark_read(
    State(handlers): State<ChatHandlers>,
    RequireMember(member_id): RequireMember,
    Path(room_id): Path<String>,
    Json(req): Json<MarkReadRequest>,
) -> Response {
    let room_id = match parse_room_id(&room_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let cmd = MarkReadCommand {
        room_id,
        member_id,
        upto_message_id: req.last_read_message_id,
    };

    match handlers.mark_read_handler.handle(cmd).await {
        Ok(result) => (StatusCode::OK, Json(MarkReadResponse::new(room_id, result))).into_response(),
        Err(e) => handle_chat_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn parse_room_id(raw: &str) -> Result<RoomId, Response> {
    raw.parse::<RoomId>()
        .map_err(|_| bad_request("Invalid chat room ID"))
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(message)),
    )
        .into_response()
}

fn handle_chat_error(error: ChatError) -> Response {
    let status = match error.kind() {
        ChatErrorKind::NotFound => StatusCode::NOT_FOUND,
        ChatErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ChatErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ChatErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %error, "chat request failed");
        ErrorResponse::new(error.code(), "Internal server error")
    } else {
        ErrorResponse::new(error.code(), error.message())
    };

    (status, Json(body)).into_response()
}
