//! Application layer - Commands, Queries, and Handlers.
//!
//! Handlers run each write inside one [`TransactionScope`]; everything that
//! leaves the room store (counter updates, pushes) is deferred to the
//! [`AfterCommitRunner`].

pub mod after_commit;
pub mod handlers;
pub mod unread_tracker;

pub use after_commit::{AfterCommitRunner, Effect, EffectError, TransactionScope};
pub use handlers::{
    CreateRoomCommand, CreateRoomHandler, CreateRoomResult, GetRoomHandler, GetRoomQuery,
    ListMessagesHandler, ListMessagesQuery, ListRoomsHandler, ListRoomsQuery, MarkReadCommand,
    MarkReadHandler, MarkReadResult, SendMessageCommand, SendMessageHandler,
};
pub use unread_tracker::UnreadTracker;
