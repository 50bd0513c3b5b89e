//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the chat core to external systems:
//! - `postgres` - Room store and marketplace directory (PostgreSQL)
//! - `memory` - Room store and directory held in process memory
//! - `unread` - Unread counters (Redis, in-memory)
//! - `websocket` - Live connections, room channels and push fan-out
//! - `http` - REST API

pub mod http;
pub mod memory;
pub mod postgres;
pub mod unread;
pub mod websocket;

pub use memory::InMemoryChatDatabase;
pub use unread::{InMemoryUnreadCounter, RedisUnreadCounter};
pub use websocket::{InMemoryConnectionRegistry, RegistryNotificationPublisher, RoomChannels};
