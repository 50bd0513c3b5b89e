//! Message entity and message text value object.

use crate::domain::foundation::{MembershipId, MessageId, RoomId, Timestamp, ValidationError};

/// Longest message body the store accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 5_000;

/// Message body that contains at least one non-whitespace character.
///
/// Length is bounded by the store, not here, so an over-long body reaches the
/// transaction and aborts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::empty_field("text"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Persisted message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_membership_id: MembershipId,
    pub text: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(MessageText::parse("").is_err());
        assert!(MessageText::parse("  \n\t").is_err());
    }

    #[test]
    fn text_is_kept_verbatim() {
        let text = MessageText::parse("  is it available?  ").unwrap();
        assert_eq!(text.as_str(), "  is it available?  ");
    }

    #[test]
    fn over_long_text_is_left_to_the_store() {
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(MessageText::parse(long).is_ok());
    }
}
