//! Redis-backed unread counters.
//!
//! One hash per (recipient, room) with fields `count`, `read` and `through`.
//! `read` and `through` hold the recount the value was last set from (0 for
//! none). Increments for messages at or below `through` are skipped, and a
//! recount only lands when neither watermark goes backwards. Both checks run
//! in Lua so they are atomic with the write. Every command is bounded by the
//! configured timeout so a stalled Redis degrades reads to zero instead of
//! hanging a request, and the connection opens lazily so a Redis that is down
//! at boot does the same.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tokio::sync::OnceCell;

use crate::config::RedisConfig;
use crate::domain::foundation::MessageId;
use crate::ports::{UnreadCounter, UnreadCounterError, UnreadKey, UnreadRecount};

const INCREMENT_LUA: &str = r"
local through = tonumber(redis.call('HGET', KEYS[1], 'through') or '0')
if tonumber(ARGV[1]) <= through then
  return redis.call('HGET', KEYS[1], 'count') or '0'
end
return tostring(redis.call('HINCRBY', KEYS[1], 'count', 1))
";

const RECONCILE_LUA: &str = r"
local read = tonumber(redis.call('HGET', KEYS[1], 'read') or '0')
local through = tonumber(redis.call('HGET', KEYS[1], 'through') or '0')
if tonumber(ARGV[2]) < read or tonumber(ARGV[3]) < through then
  return 0
end
redis.call('HSET', KEYS[1], 'count', ARGV[1], 'read', ARGV[2], 'through', ARGV[3])
return 1
";

#[derive(Clone)]
pub struct RedisUnreadCounter {
    client: redis::Client,
    conn: Arc<OnceCell<MultiplexedConnection>>,
    key_prefix: String,
    timeout: Duration,
    increment_script: Script,
    reconcile_script: Script,
}

impl RedisUnreadCounter {
    /// Build a counter for `config` without touching the network.
    ///
    /// The connection opens on first use. Until it succeeds every call fails
    /// with `Unavailable` and the next call tries again.
    pub fn open(config: &RedisConfig) -> Result<Self, UnreadCounterError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e: redis::RedisError| UnreadCounterError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
            key_prefix: config.key_prefix.clone(),
            timeout: config.timeout(),
            increment_script: Script::new(INCREMENT_LUA),
            reconcile_script: Script::new(RECONCILE_LUA),
        })
    }

    /// Open the connection now rather than on first use.
    pub async fn connect(&self) -> Result<(), UnreadCounterError> {
        self.connection().await.map(drop)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, UnreadCounterError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tokio::time::timeout(self.timeout, self.client.get_multiplexed_tokio_connection())
                    .await
                    .map_err(|_| UnreadCounterError::Unavailable("connection timed out".to_string()))?
                    .map_err(|e: redis::RedisError| UnreadCounterError::Unavailable(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }

    fn key(&self, key: UnreadKey) -> String {
        format!("{}{}", self.key_prefix, key.to_redis_key())
    }

    async fn bounded<T, F>(&self, command: F) -> Result<T, UnreadCounterError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| UnreadCounterError::Unavailable("command timed out".to_string()))?
            .map_err(|e: redis::RedisError| UnreadCounterError::Unavailable(e.to_string()))
    }
}

/// Watermark encoding: message ids are positive, so 0 stands for none.
fn watermark(id: Option<MessageId>) -> i64 {
    id.map(|id| id.value()).unwrap_or(0)
}

fn parse_count(key: &str, raw: String) -> Result<u64, UnreadCounterError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| UnreadCounterError::Corrupt {
            key: key.to_string(),
            raw,
        })
}

#[async_trait]
impl UnreadCounter for RedisUnreadCounter {
    async fn increment(
        &self,
        key: UnreadKey,
        message_id: MessageId,
    ) -> Result<u64, UnreadCounterError> {
        let redis_key = self.key(key);
        let mut conn = self.connection().await?;

        let mut invocation = self.increment_script.key(&redis_key);
        invocation.arg(message_id.value());
        let raw: String = self.bounded(invocation.invoke_async(&mut conn)).await?;
        parse_count(&redis_key, raw)
    }

    async fn get(&self, key: UnreadKey) -> Result<Option<u64>, UnreadCounterError> {
        let redis_key = self.key(key);
        let mut conn = self.connection().await?;

        let raw: Option<String> = self.bounded(conn.hget(&redis_key, "count")).await?;
        raw.map(|raw| parse_count(&redis_key, raw)).transpose()
    }

    async fn reconcile(
        &self,
        key: UnreadKey,
        recount: UnreadRecount,
    ) -> Result<bool, UnreadCounterError> {
        let redis_key = self.key(key);
        let mut conn = self.connection().await?;

        let mut invocation = self.reconcile_script.key(&redis_key);
        invocation
            .arg(recount.count)
            .arg(watermark(recount.read_upto))
            .arg(watermark(recount.through));
        let applied: i64 = self.bounded(invocation.invoke_async(&mut conn)).await?;
        Ok(applied == 1)
    }

    async fn clear(&self, key: UnreadKey) -> Result<(), UnreadCounterError> {
        let redis_key = self.key(key);
        let mut conn = self.connection().await?;

        self.bounded(conn.del::<_, ()>(&redis_key)).await
    }
}

impl std::fmt::Debug for RedisUnreadCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisUnreadCounter")
            .field("key_prefix", &self.key_prefix)
            .field("timeout", &self.timeout)
            .field("connected", &self.conn.initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::UnreadTracker;
    use crate::domain::foundation::{MemberId, RoomId};

    #[test]
    fn parses_stored_counts() {
        assert_eq!(parse_count("k", "7".to_string()).unwrap(), 7);
        assert_eq!(parse_count("k", " 12\n".to_string()).unwrap(), 12);
    }

    #[test]
    fn missing_watermarks_encode_as_zero() {
        assert_eq!(watermark(None), 0);
        assert_eq!(watermark(Some(MessageId::new(42))), 42);
    }

    #[test]
    fn negative_or_garbage_values_are_corrupt() {
        assert!(matches!(
            parse_count("unread:1:2", "-1".to_string()),
            Err(UnreadCounterError::Corrupt { .. })
        ));
        assert!(matches!(
            parse_count("unread:1:2", "many".to_string()),
            Err(UnreadCounterError::Corrupt { ref raw, .. }) if raw == "many"
        ));
    }

    #[test]
    fn malformed_url_is_rejected_up_front() {
        let config = RedisConfig {
            url: "not a redis url".to_string(),
            ..Default::default()
        };
        assert!(RedisUnreadCounter::open(&config).is_err());
    }

    #[tokio::test]
    async fn unreachable_redis_fails_calls_but_not_construction() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1/".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let counter = RedisUnreadCounter::open(&config).unwrap();
        let key = UnreadKey::new(MemberId::new(1), RoomId::new(2));

        assert!(matches!(
            counter.connect().await,
            Err(UnreadCounterError::Unavailable(_))
        ));
        assert!(matches!(
            counter.increment(key, MessageId::new(1)).await,
            Err(UnreadCounterError::Unavailable(_))
        ));

        let tracker = UnreadTracker::new(Arc::new(counter));
        assert_eq!(tracker.count(MemberId::new(1), RoomId::new(2)).await, 0);
    }

    // Needs a running Redis: RENTAL_CHAT_TEST_REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn round_trips_against_live_redis() {
        let url = std::env::var("RENTAL_CHAT_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let config = RedisConfig {
            url,
            key_prefix: format!("test:{}:", uuid::Uuid::new_v4()),
            ..Default::default()
        };
        let counter = RedisUnreadCounter::open(&config).unwrap();
        counter.connect().await.unwrap();
        let key = UnreadKey::new(MemberId::new(1), RoomId::new(2));

        assert_eq!(counter.get(key).await.unwrap(), None);
        assert_eq!(counter.increment(key, MessageId::new(1)).await.unwrap(), 1);
        assert_eq!(counter.increment(key, MessageId::new(2)).await.unwrap(), 2);

        let recount = UnreadRecount {
            count: 5,
            read_upto: None,
            through: Some(MessageId::new(6)),
        };
        assert!(counter.reconcile(key, recount).await.unwrap());
        assert_eq!(counter.get(key).await.unwrap(), Some(5));
        assert_eq!(counter.increment(key, MessageId::new(6)).await.unwrap(), 5);

        let stale = UnreadRecount {
            through: Some(MessageId::new(3)),
            ..recount
        };
        assert!(!counter.reconcile(key, stale).await.unwrap());
        counter.clear(key).await.unwrap();
        assert_eq!(counter.get(key).await.unwrap(), None);
    }
}
