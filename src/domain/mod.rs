//! Domain layer containing chat types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, paging, error codes)
//! - `chat` - Rooms, memberships, messages and push notifications

pub mod chat;
pub mod foundation;
