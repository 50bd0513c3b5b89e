//! Marketplace lookups backed by the `listings` and `members` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{column, store_error};
use crate::domain::chat::{ListingSnapshot, MemberProfile};
use crate::domain::foundation::{ListingId, MemberId};
use crate::ports::{ListingDirectory, MemberDirectory, StoreError};

#[derive(Clone)]
pub struct PostgresMarketplaceDirectory {
    pool: PgPool,
}

impl PostgresMarketplaceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingDirectory for PostgresMarketplaceDirectory {
    async fn find_listing(&self, listing_id: ListingId) -> Result<Option<ListingSnapshot>, StoreError> {
        let row = sqlx::query("SELECT id, owner_id, title FROM listings WHERE id = $1")
            .bind(listing_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to fetch listing", e))?;

        row.map(|row| {
            Ok(ListingSnapshot {
                id: ListingId::new(column(&row, "id")?),
                owner_id: MemberId::new(column(&row, "owner_id")?),
                title: column(&row, "title")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl MemberDirectory for PostgresMarketplaceDirectory {
    async fn find_profile(&self, member_id: MemberId) -> Result<Option<MemberProfile>, StoreError> {
        let row = sqlx::query("SELECT id, nickname, profile_img_url FROM members WHERE id = $1")
            .bind(member_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to fetch member", e))?;

        row.map(|row| {
            Ok(MemberProfile {
                id: MemberId::new(column(&row, "id")?),
                nickname: column(&row, "nickname")?,
                avatar_url: column(&row, "profile_img_url")?,
            })
        })
        .transpose()
    }
}
