//! In-memory room store for tests and single-process development.

mod chat_database;

pub use chat_database::{InMemoryChatDatabase, InMemoryTransaction};
