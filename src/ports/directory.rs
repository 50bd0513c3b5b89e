//! Read-only lookups into the surrounding marketplace.

use async_trait::async_trait;

use super::chat_store::StoreError;
use crate::domain::chat::{ListingSnapshot, MemberProfile};
use crate::domain::foundation::{ListingId, MemberId};

/// Listing collaborator, consulted only when a room is created.
#[async_trait]
pub trait ListingDirectory: Send + Sync {
    async fn find_listing(&self, listing_id: ListingId) -> Result<Option<ListingSnapshot>, StoreError>;
}

/// Member profiles as they are right now.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_profile(&self, member_id: MemberId) -> Result<Option<MemberProfile>, StoreError>;
}
