//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;

pub use chat::{
    // Commands and queries
    CreateRoomCommand, GetRoomQuery, ListMessagesQuery, ListRoomsQuery, MarkReadCommand,
    SendMessageCommand,
    // Handlers
    CreateRoomHandler, GetRoomHandler, ListMessagesHandler, ListRoomsHandler, MarkReadHandler,
    SendMessageHandler,
    // Results
    CreateRoomResult, MarkReadResult,
};
