//! Caller identity for the chat API.
//!
//! The upstream auth layer authenticates the request and forwards the member
//! id in the `X-Member-Id` header. This module only reads it.
//!
//! ```text
//! Gateway (auth) → X-Member-Id: 42 → RequireMember extractor → Handler
//! ```
//!
//! # Example
//!
//! ```ignore
//! async fn my_handler(RequireMember(member_id): RequireMember) -> impl IntoResponse {
//!     format!("Hello, member {}!", member_id)
//! }
//! ```

use axum::{
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{ErrorCode, MemberId};

/// Header carrying the authenticated member id.
pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// Extractor that requires an authenticated member.
///
/// Returns 401 when the header is missing or does not hold a member id.
#[derive(Debug, Clone, Copy)]
pub struct RequireMember(pub MemberId);

impl<S> axum::extract::FromRequestParts<S> for RequireMember
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { member_from_parts(parts).map(RequireMember) })
    }
}

fn member_from_parts(parts: &Parts) -> Result<MemberId, AuthRejection> {
    let raw = parts
        .headers
        .get(MEMBER_ID_HEADER)
        .ok_or(AuthRejection::Unauthenticated)?;
    raw.to_str()
        .ok()
        .and_then(|value| value.parse::<MemberId>().ok())
        .ok_or(AuthRejection::InvalidIdentity)
}

/// Rejection type for identity failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No member header was forwarded.
    Unauthenticated,
    /// The header is present but not a member id.
    InvalidIdentity,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::Unauthenticated => "Authentication required",
            AuthRejection::InvalidIdentity => "Invalid member identity",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "errorCode": ErrorCode::Unauthorized.to_string(),
                "message": message,
            })),
        )
            .into_response()
    }
}
