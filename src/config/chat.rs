//! Delivery tuning for live connections, room channels and paging

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_PUSH_BUFFER: usize = 4_096;
const MAX_ROOM_CAPACITY: usize = 16_384;

/// Chat delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Per-connection buffer of pending notification frames
    #[serde(default = "default_push_buffer")]
    pub push_buffer: usize,

    /// Broadcast capacity of each room channel
    #[serde(default = "default_room_channel_capacity")]
    pub room_channel_capacity: usize,

    /// Seconds without any client frame before a live connection is closed
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Page size used when a list request does not give one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size a list request may ask for
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl ChatConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.push_buffer == 0 || self.push_buffer > MAX_PUSH_BUFFER {
            return Err(ValidationError::InvalidPushBuffer {
                max: MAX_PUSH_BUFFER,
            });
        }
        if self.room_channel_capacity == 0 || self.room_channel_capacity > MAX_ROOM_CAPACITY {
            return Err(ValidationError::InvalidRoomCapacity {
                max: MAX_ROOM_CAPACITY,
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            push_buffer: default_push_buffer(),
            room_channel_capacity: default_room_channel_capacity(),
            idle_timeout_secs: default_idle_timeout(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_push_buffer() -> usize {
    64
}

fn default_room_channel_capacity() -> usize {
    256
}

fn default_idle_timeout() -> u64 {
    120
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}
