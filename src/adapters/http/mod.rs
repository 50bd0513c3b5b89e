//! HTTP adapters - REST API implementations.

pub mod chat;
pub mod middleware;

pub use chat::{chat_routes, ChatHandlers};
