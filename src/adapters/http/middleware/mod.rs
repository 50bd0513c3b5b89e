//! HTTP middleware for axum.
//!
//! - `auth` - Caller identity extractor

pub mod auth;

pub use auth::{AuthRejection, RequireMember, MEMBER_ID_HEADER};
