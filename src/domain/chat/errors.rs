//! Chat-specific error types.

use crate::domain::foundation::{ErrorCode, ListingId, MemberId, RoomId, ValidationError};

/// Broad category of a [`ChatError`], used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    NotFound,
    Forbidden,
    InvalidRequest,
    Internal,
}

/// Errors returned by the chat handlers.
///
/// Uniqueness conflicts never appear here: a lost room-creation race is
/// resolved by returning the room the winner created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    ListingNotFound(ListingId),
    RoomNotFound(RoomId),
    MemberNotFound(MemberId),
    /// The member is not a party to the room.
    Forbidden { room_id: RoomId, member_id: MemberId },
    /// A listing owner tried to open a room on their own listing.
    SelfChat(ListingId),
    ValidationFailed { field: String, message: String },
    /// The transactional store failed; nothing was committed.
    Storage(String),
}

impl ChatError {
    pub fn forbidden(room_id: RoomId, member_id: MemberId) -> Self {
        ChatError::Forbidden { room_id, member_id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ChatError::Storage(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::ListingNotFound(_) => ErrorCode::ListingNotFound,
            ChatError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            ChatError::MemberNotFound(_) => ErrorCode::MemberNotFound,
            ChatError::Forbidden { .. } => ErrorCode::Forbidden,
            ChatError::SelfChat(_) => ErrorCode::SelfChat,
            ChatError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ChatError::Storage(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn kind(&self) -> ChatErrorKind {
        match self {
            ChatError::ListingNotFound(_)
            | ChatError::RoomNotFound(_)
            | ChatError::MemberNotFound(_) => ChatErrorKind::NotFound,
            ChatError::Forbidden { .. } => ChatErrorKind::Forbidden,
            ChatError::SelfChat(_) | ChatError::ValidationFailed { .. } => {
                ChatErrorKind::InvalidRequest
            }
            ChatError::Storage(_) => ChatErrorKind::Internal,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ChatError::ListingNotFound(id) => format!("Listing not found: {}", id),
            ChatError::RoomNotFound(id) => format!("Chat room not found: {}", id),
            ChatError::MemberNotFound(id) => format!("Member not found: {}", id),
            ChatError::Forbidden { room_id, .. } => {
                format!("Not a participant of chat room {}", room_id)
            }
            ChatError::SelfChat(_) => "Cannot open a chat on your own listing".to_string(),
            ChatError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ChatError::Storage(msg) => format!("Storage error: {}", msg),
        }
    }
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ChatError {}

impl From<ValidationError> for ChatError {
    fn from(err: ValidationError) -> Self {
        ChatError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
