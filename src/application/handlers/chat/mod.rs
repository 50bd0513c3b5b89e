//! Chat command and query handlers.

mod create_room;
mod get_room;
mod list_messages;
mod list_rooms;
mod mark_read;
mod send_message;

#[cfg(test)]
mod test_support;

pub use create_room::{CreateRoomCommand, CreateRoomHandler, CreateRoomResult};
pub use get_room::{GetRoomHandler, GetRoomQuery};
pub use list_messages::{ListMessagesHandler, ListMessagesQuery};
pub use list_rooms::{ListRoomsHandler, ListRoomsQuery};
pub use mark_read::{MarkReadCommand, MarkReadHandler, MarkReadResult};
pub use send_message::{SendMessageCommand, SendMessageHandler};
