//! PostgreSQL adapters for the room store.
//!
//! - `PostgresChatStore` - Transactional writes (`ChatStore`)
//! - `PostgresChatReader` - Queries against committed rows (`ChatReader`)
//! - `PostgresMarketplaceDirectory` - Listing and member lookups
//!
//! The schema lives in `migrations/`. Listing and member rows belong to the
//! marketplace and are only read here.

mod chat_reader;
mod chat_store;
mod directory;

pub use chat_reader::PostgresChatReader;
pub use chat_store::{PostgresChatStore, PostgresChatTransaction};
pub use directory::PostgresMarketplaceDirectory;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};

use crate::config::DatabaseConfig;
use crate::domain::chat::{LastMessage, Membership, Room};
use crate::domain::foundation::{ListingId, MemberId, MembershipId, MessageId, RoomId, Timestamp};
use crate::ports::{StoreError, UnreadRecount};

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool configured from `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let mut options: PgConnectOptions = config.url.parse()?;
    options = options.application_name(&config.application_name);
    if let Some(timeout) = config.statement_timeout_setting() {
        options = options.options([("statement_timeout", timeout)]);
    }

    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect_with(options)
        .await
}

/// SQLSTATE for a value longer than its column allows.
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";

/// Map a driver error onto the store's error taxonomy.
pub(crate) fn store_error(context: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::UniqueViolation(
            format!("{}: {}", context, db_err.constraint().unwrap_or("unique")),
        ),
        sqlx::Error::Database(db_err)
            if db_err.is_check_violation()
                || db_err.is_foreign_key_violation()
                || db_err.code().as_deref() == Some(STRING_DATA_RIGHT_TRUNCATION) =>
        {
            StoreError::ConstraintViolation(format!(
                "{}: {}",
                context,
                db_err.constraint().unwrap_or("constraint")
            ))
        }
        _ => StoreError::Database(format!("{}: {}", context, err)),
    }
}

pub(crate) fn column<'r, T>(row: &'r sqlx::postgres::PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Database(format!("Failed to get {}: {}", name, e)))
}

pub(crate) fn row_to_room(row: &sqlx::postgres::PgRow) -> Result<Room, StoreError> {
    let last_text: Option<String> = column(row, "last_message")?;
    let last_at: Option<chrono::DateTime<chrono::Utc>> = column(row, "last_message_at")?;
    let last_message = match (last_text, last_at) {
        (Some(text), Some(at)) => Some(LastMessage {
            text,
            at: Timestamp::from_datetime(at),
        }),
        _ => None,
    };

    Ok(Room::reconstitute(
        RoomId::new(column(row, "id")?),
        ListingId::new(column(row, "listing_id")?),
        MemberId::new(column(row, "guest_member_id")?),
        column(row, "listing_title_snapshot")?,
        Timestamp::from_datetime(column(row, "created_at")?),
        last_message,
    ))
}

pub(crate) fn row_to_membership(row: &sqlx::postgres::PgRow) -> Result<Membership, StoreError> {
    let last_read: Option<i64> = column(row, "last_read_message_id")?;
    Ok(Membership::reconstitute(
        MembershipId::new(column(row, "id")?),
        RoomId::new(column(row, "chat_room_id")?),
        MemberId::new(column(row, "member_id")?),
        last_read.map(MessageId::new),
    ))
}

/// Unread count for one membership plus the pointer and newest room message
/// it was counted against, in a single statement.
pub(crate) const RECOUNT_SQL: &str = r#"
    SELECT
        COUNT(msg.id) FILTER (
            WHERE msg.chat_member_id <> me.id
              AND (me.last_read_message_id IS NULL OR msg.id > me.last_read_message_id)
        ) AS unread,
        me.last_read_message_id,
        MAX(msg.id) AS through
    FROM chat_members me
    LEFT JOIN chat_messages msg ON msg.chat_room_id = me.chat_room_id
    WHERE me.id = $1
    GROUP BY me.id, me.last_read_message_id
"#;

pub(crate) fn row_to_recount(row: Option<sqlx::postgres::PgRow>) -> Result<UnreadRecount, StoreError> {
    let Some(row) = row else {
        return Ok(UnreadRecount::default());
    };
    let unread: i64 = column(&row, "unread")?;
    let read_upto: Option<i64> = column(&row, "last_read_message_id")?;
    let through: Option<i64> = column(&row, "through")?;
    Ok(UnreadRecount {
        count: unread.max(0) as u64,
        read_upto: read_upto.map(MessageId::new),
        through: through.map(MessageId::new),
    })
}

/// `%keyword%` with LIKE metacharacters escaped (escape char `\`).
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for PgFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SQLSTATE {}", self.code)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "rejected"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn failure(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure { code, constraint }))
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("loft"), "%loft%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn unique_violation_keeps_constraint_name() {
        let err = store_error("insert room", failure("23505", Some("uq_chat_rooms_listing_guest")));
        assert_eq!(
            err,
            StoreError::UniqueViolation("insert room: uq_chat_rooms_listing_guest".to_string())
        );
    }

    #[test]
    fn check_and_length_rejections_are_constraint_violations() {
        let check = store_error(
            "insert message",
            failure("23514", Some("ck_chat_messages_content_length")),
        );
        let too_long = store_error("insert message", failure("22001", None));

        assert!(matches!(check, StoreError::ConstraintViolation(_)));
        assert!(matches!(too_long, StoreError::ConstraintViolation(_)));
    }

    #[test]
    fn other_failures_are_database_errors() {
        let err = store_error("insert message", failure("57014", None));
        assert!(matches!(err, StoreError::Database(_)));
    }
}
