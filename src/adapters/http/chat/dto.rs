//! HTTP DTOs for chat endpoints.
//!
//! Room and message views already serialize in the public camelCase shape,
//! so responses reuse them. Only requests and envelopes live here.

use serde::{Deserialize, Serialize};

use crate::domain::chat::Room;
use crate::domain::foundation::{ErrorCode, ListingId, MessageId, RoomId};
use crate::application::{CreateRoomResult, MarkReadResult};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to open (or reopen) the room for a listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub listing_id: ListingId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub last_read_message_id: MessageId,
}

/// Query parameters for paged lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub keyword: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
    pub listing_id: ListingId,
    pub created: bool,
}

impl From<CreateRoomResult> for CreateRoomResponse {
    fn from(result: CreateRoomResult) -> Self {
        let room: Room = result.room;
        Self {
            room_id: room.id(),
            listing_id: room.listing_id(),
            created: result.created,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub room_id: RoomId,
    pub advanced: bool,
    pub last_read_message_id: Option<MessageId>,
}

impl MarkReadResponse {
    pub fn new(room_id: RoomId, result: MarkReadResult) -> Self {
        Self {
            room_id,
            advanced: result.advanced,
            last_read_message_id: result.last_read_message_id,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }
}
