//! PostgreSQL implementation of ChatStore.
//!
//! `(listing_id, guest_member_id)` is unique in `chat_rooms`. A second
//! concurrent insert for the same pair blocks until the first transaction
//! ends and then fails with a unique violation, which surfaces as
//! `StoreError::UniqueViolation` for the caller to resolve.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{column, row_to_membership, row_to_recount, row_to_room, store_error, RECOUNT_SQL};
use crate::domain::chat::{Message, Participants, Room};
use crate::domain::foundation::{
    ListingId, MemberId, MembershipId, MessageId, RoomId, Timestamp,
};
use crate::ports::{
    ChatStore, ChatTransaction, CreatedRoom, NewMessage, NewRoom, StoreError, UnreadRecount,
};

#[derive(Clone)]
pub struct PostgresChatStore {
    pool: PgPool,
}

impl PostgresChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PostgresChatStore {
    async fn begin(&self) -> Result<Box<dyn ChatTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;
        Ok(Box::new(PostgresChatTransaction { tx }))
    }
}

pub struct PostgresChatTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ChatTransaction for PostgresChatTransaction {
    async fn find_room_for_guest(
        &mut self,
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
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to fetch room", e))?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn insert_room(&mut self, new_room: NewRoom) -> Result<CreatedRoom, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_rooms AS r (listing_id, guest_member_id, listing_title_snapshot)
            VALUES ($1, $2, $3)
            RETURNING r.id, r.listing_id, r.guest_member_id, r.listing_title_snapshot,
                      r.created_at, r.last_message, r.last_message_at
            "#,
        )
        .bind(new_room.listing_id.value())
        .bind(new_room.guest_id.value())
        .bind(&new_room.title_snapshot)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to insert room", e))?;
        let room = row_to_room(&row)?;

        let rows = sqlx::query(
            r#"
            INSERT INTO chat_members (chat_room_id, member_id)
            VALUES ($1, $2), ($1, $3)
            RETURNING id, chat_room_id, member_id, last_read_message_id
            "#,
        )
        .bind(room.id().value())
        .bind(new_room.host_id.value())
        .bind(new_room.guest_id.value())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to insert room members", e))?;

        let mut memberships = rows
            .iter()
            .map(row_to_membership)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        let (first, second) = match (memberships.next(), memberships.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => {
                return Err(StoreError::Database(
                    "room inserted without two members".to_string(),
                ))
            }
        };
        let oriented = Participants::for_member(new_room.host_id, first, second).ok_or_else(
            || StoreError::Database("host membership missing after insert".to_string()),
        )?;

        Ok(CreatedRoom {
            room,
            host: oriented.me,
            guest: oriented.other,
        })
    }

    async fn find_participants(
        &mut self,
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
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to fetch room members", e))?;

        participants_from_rows(&rows, member_id)
    }

    async fn insert_message(&mut self, message: NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_messages (chat_room_id, chat_member_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, chat_room_id, chat_member_id, content, created_at
            "#,
        )
        .bind(message.room_id.value())
        .bind(message.sender_membership_id.value())
        .bind(&message.text)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to insert message", e))?;

        Ok(Message {
            id: MessageId::new(column(&row, "id")?),
            room_id: RoomId::new(column(&row, "chat_room_id")?),
            sender_membership_id: MembershipId::new(column(&row, "chat_member_id")?),
            text: column(&row, "content")?,
            created_at: Timestamp::from_datetime(column(&row, "created_at")?),
        })
    }

    async fn update_last_message(
        &mut self,
        room_id: RoomId,
        text: &str,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE chat_rooms
            SET last_message = $2, last_message_at = $3
            WHERE id = $1 AND (last_message_at IS NULL OR last_message_at <= $3)
            "#,
        )
        .bind(room_id.value())
        .bind(text)
        .bind(at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to update last message", e))?;

        Ok(())
    }

    async fn latest_message_at_or_before(
        &mut self,
        room_id: RoomId,
        upto: MessageId,
    ) -> Result<Option<MessageId>, StoreError> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(id) FROM chat_messages WHERE chat_room_id = $1 AND id <= $2",
        )
        .bind(room_id.value())
        .bind(upto.value())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to resolve read position", e))?;

        Ok(latest.map(MessageId::new))
    }

    async fn advance_read_pointer(
        &mut self,
        membership_id: MembershipId,
        to: MessageId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_members
            SET last_read_message_id = $2
            WHERE id = $1
              AND (last_read_message_id IS NULL OR last_read_message_id < $2)
            "#,
        )
        .bind(membership_id.value())
        .bind(to.value())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("Failed to advance read pointer", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unread(
        &mut self,
        membership_id: MembershipId,
    ) -> Result<UnreadRecount, StoreError> {
        let row = sqlx::query(RECOUNT_SQL)
            .bind(membership_id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| store_error("Failed to count unread messages", e))?;

        row_to_recount(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error("Failed to commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| store_error("Failed to roll back", e))
    }
}

pub(super) fn participants_from_rows(
    rows: &[sqlx::postgres::PgRow],
    member_id: MemberId,
) -> Result<Option<Participants>, StoreError> {
    let mut memberships = rows.iter().map(row_to_membership);
    match (memberships.next(), memberships.next()) {
        (Some(first), Some(second)) => Ok(Participants::for_member(member_id, first?, second?)),
        _ => Ok(None),
    }
}
