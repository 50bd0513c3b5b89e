//! Chat HTTP adapter.
//!
//! Exposes the chat handlers as REST endpoints under `/api/chats`.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ChatHandlers;
pub use routes::chat_routes;
