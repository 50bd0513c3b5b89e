//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the chat core and the outside world. Adapters implement these ports.
//!
//! ## Room Store
//!
//! - `ChatStore` / `ChatTransaction` - Transactional writes
//! - `ChatReader` - Queries against committed state
//! - `ListingDirectory`, `MemberDirectory` - Marketplace lookups
//!
//! ## Delivery
//!
//! - `UnreadCounter` - Fast advisory unread counters
//! - `RoomMessagePublisher` - Room-scoped fan-out
//! - `NotificationPublisher` - Recipient-scoped fan-out
//! - `ConnectionRegistry` - Live push connections of this process

mod chat_reader;
mod chat_store;
mod connection_registry;
mod directory;
mod publishers;
mod unread_counter;

pub use chat_reader::{ChatReader, RoomListEntry};
pub use chat_store::{ChatStore, ChatTransaction, CreatedRoom, NewMessage, NewRoom, StoreError};
pub use connection_registry::{
    ConnectionId, ConnectionRegistry, ConnectionRegistryError, ConnectionState, LiveConnection,
    PushOutcome, PushReceiver, Registration,
};
pub use directory::{ListingDirectory, MemberDirectory};
pub use publishers::{NotificationPublisher, PublishError, RoomMessagePublisher};
pub use unread_counter::{UnreadCounter, UnreadCounterError, UnreadKey, UnreadRecount};
