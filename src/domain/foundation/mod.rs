//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, paging and error codes used across the chat
//! domain and its adapters.

mod errors;
mod ids;
mod page;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use ids::{ListingId, MemberId, MembershipId, MessageId, RoomId};
pub use page::{Page, PageRequest};
pub use timestamp::Timestamp;
