//! Unread counter adapters.

mod in_memory;
mod redis;

pub use self::redis::RedisUnreadCounter;
pub use in_memory::InMemoryUnreadCounter;
