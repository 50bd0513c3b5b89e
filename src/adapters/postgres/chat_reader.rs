//! PostgreSQL implementation of ChatReader.

use async_trait::async_trait;
use sqlx::PgPool;

use super::chat_store::participants_from_rows;
use super::{column, contains_pattern, row_to_recount, row_to_room, store_error, RECOUNT_SQL};
use crate::domain::chat::{MemberProfile, MessageView, Participants, Room};
use crate::domain::foundation::{
    ListingId, MemberId, MembershipId, MessageId, Page, PageRequest, RoomId, Timestamp,
};
use crate::ports::{ChatReader, RoomListEntry, StoreError, UnreadRecount};

#[derive(Clone)]
pub struct PostgresChatReader {
    pool: PgPool,
}

impl PostgresChatReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatReader for PostgresChatReader {
    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.listing_id, r.guest_member_id, r.listing_title_snapshot,
                   r.created_at, r.last_message, r.last_message_at
            FROM chat_rooms r
            WHERE r.id = $1
            "#,
        )
        .bind(room_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch room", e))?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn find_room_for_guest(
        &self,
        listing_id: ListingId,
        guest_id: MemberId,
    ) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT r.id, r.listing_id, r.guest_member_id, r.listing_title_snapshot,
                   r.created_at, r.last_message, r.last_message_at
            FROM chat_rooms r
            WHERE r.listing_id = $1 AND r.guest_member_id = $2
            "#,
        )
        .bind(listing_id.value())
        .bind(guest_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch room", e))?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn find_participants(
        &self,
        room_id: RoomId,
        member_id: MemberId,
    ) -> Result<Option<Participants>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_room_id, member_id, last_read_message_id
            FROM chat_members
            WHERE chat_room_id = $1
            ORDER BY id
            "#,
        )
        .bind(room_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch room members", e))?;

        participants_from_rows(&rows, member_id)
    }

    async fn list_rooms(
        &self,
        member_id: MemberId,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<RoomListEntry>, StoreError> {
        let pattern = keyword.map(contains_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM chat_members me
            JOIN chat_rooms r ON r.id = me.chat_room_id
            JOIN chat_members o ON o.chat_room_id = r.id AND o.id <> me.id
            LEFT JOIN members m ON m.id = o.member_id
            WHERE me.member_id = $1
              AND ($2::text IS NULL
                   OR r.listing_title_snapshot ILIKE $2 ESCAPE '\'
                   OR m.nickname ILIKE $2 ESCAPE '\')
            "#,
        )
        .bind(member_id.value())
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to count rooms", e))?;

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.listing_id, r.guest_member_id, r.listing_title_snapshot,
                   r.created_at, r.last_message, r.last_message_at,
                   o.member_id AS other_member_id,
                   COALESCE(m.nickname, '') AS other_nickname,
                   m.profile_img_url AS other_avatar_url
            FROM chat_members me
            JOIN chat_rooms r ON r.id = me.chat_room_id
            JOIN chat_members o ON o.chat_room_id = r.id AND o.id <> me.id
            LEFT JOIN members m ON m.id = o.member_id
            WHERE me.member_id = $1
              AND ($2::text IS NULL
                   OR r.listing_title_snapshot ILIKE $2 ESCAPE '\'
                   OR m.nickname ILIKE $2 ESCAPE '\')
            ORDER BY COALESCE(r.last_message_at, r.created_at) DESC, r.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(member_id.value())
        .bind(pattern.as_deref())
        .bind(i64::from(page.size()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list rooms", e))?;

        let entries = rows
            .iter()
            .map(|row| {
                Ok(RoomListEntry {
                    room: row_to_room(row)?,
                    other_member: MemberProfile {
                        id: MemberId::new(column(row, "other_member_id")?),
                        nickname: column(row, "other_nickname")?,
                        avatar_url: column(row, "other_avatar_url")?,
                    },
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Page::new(entries, page, total.max(0) as u64))
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> Result<Page<MessageView>, StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE chat_room_id = $1")
                .bind(room_id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| store_error("Failed to count messages", e))?;

        let rows = sqlx::query(
            r#"
            SELECT msg.id, msg.chat_room_id, cm.member_id AS sender_id,
                   msg.content, msg.created_at
            FROM chat_messages msg
            JOIN chat_members cm ON cm.id = msg.chat_member_id
            WHERE msg.chat_room_id = $1
            ORDER BY msg.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(room_id.value())
        .bind(i64::from(page.size()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list messages", e))?;

        let messages = rows
            .iter()
            .map(|row| {
                Ok(MessageView {
                    id: MessageId::new(column(row, "id")?),
                    room_id: RoomId::new(column(row, "chat_room_id")?),
                    sender_id: MemberId::new(column(row, "sender_id")?),
                    text: column(row, "content")?,
                    created_at: Timestamp::from_datetime(column(row, "created_at")?),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Page::new(messages, page, total.max(0) as u64))
    }

    async fn count_unread(&self, membership_id: MembershipId) -> Result<UnreadRecount, StoreError> {
        let row = sqlx::query(RECOUNT_SQL)
            .bind(membership_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to count unread messages", e))?;

        row_to_recount(row)
    }
}
