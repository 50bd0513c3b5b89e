//! Chat domain: rooms, memberships, messages and the push events derived
//! from them.

mod errors;
mod message;
mod notification;
mod room;
mod views;

pub use errors::{ChatError, ChatErrorKind};
pub use message::{Message, MessageText, MAX_MESSAGE_LENGTH};
pub use notification::{ChatNotification, NewMessagePayload, NewRoomPayload, NOTIFICATION_VERSION};
pub use room::{LastMessage, Membership, Participants, Room};
pub use views::{ListingSnapshot, ListingTitle, MemberProfile, MessageView, RoomDetail, RoomSummary};
