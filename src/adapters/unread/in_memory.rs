//! In-memory unread counters for tests and single-process development.
//!
//! Values are stored as strings, like Redis, so tests can plant corrupt
//! values. An outage switch makes every call fail as if Redis were down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::MessageId;
use crate::ports::{UnreadCounter, UnreadCounterError, UnreadKey, UnreadRecount};

#[derive(Debug, Clone)]
struct Entry {
    raw: String,
    /// The recount this value was last set from.
    basis: UnreadRecount,
}

#[derive(Debug, Default)]
pub struct InMemoryUnreadCounter {
    values: Mutex<HashMap<UnreadKey, Entry>>,
    unavailable: AtomicBool,
}

impl InMemoryUnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the counter store going down (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a raw value, bypassing parsing.
    pub fn put_raw(&self, key: UnreadKey, raw: impl Into<String>) {
        if let Ok(mut values) = self.values.lock() {
            let basis = values.get(&key).map(|e| e.basis).unwrap_or_default();
            values.insert(
                key,
                Entry {
                    raw: raw.into(),
                    basis,
                },
            );
        }
    }

    pub fn contains(&self, key: UnreadKey) -> bool {
        self.values
            .lock()
            .map(|values| values.contains_key(&key))
            .unwrap_or(false)
    }

    /// Drop every counter, as a flushed Redis would.
    pub fn wipe(&self) {
        if let Ok(mut values) = self.values.lock() {
            values.clear();
        }
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<UnreadKey, Entry>>, UnreadCounterError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UnreadCounterError::Unavailable(
                "simulated outage".to_string(),
            ));
        }
        self.values
            .lock()
            .map_err(|_| UnreadCounterError::Unavailable("counter lock poisoned".to_string()))
    }
}

fn parse(key: UnreadKey, raw: &str) -> Result<u64, UnreadCounterError> {
    raw.parse().map_err(|_| UnreadCounterError::Corrupt {
        key: key.to_redis_key(),
        raw: raw.to_string(),
    })
}

#[async_trait]
impl UnreadCounter for InMemoryUnreadCounter {
    async fn increment(
        &self,
        key: UnreadKey,
        message_id: MessageId,
    ) -> Result<u64, UnreadCounterError> {
        let mut values = self.values()?;
        match values.get_mut(&key) {
            Some(entry) if entry.basis.covers(message_id) => parse(key, &entry.raw),
            Some(entry) => {
                let next = parse(key, &entry.raw)? + 1;
                entry.raw = next.to_string();
                Ok(next)
            }
            None => {
                values.insert(
                    key,
                    Entry {
                        raw: "1".to_string(),
                        basis: UnreadRecount::default(),
                    },
                );
                Ok(1)
            }
        }
    }

    async fn get(&self, key: UnreadKey) -> Result<Option<u64>, UnreadCounterError> {
        let values = self.values()?;
        values.get(&key).map(|entry| parse(key, &entry.raw)).transpose()
    }

    async fn reconcile(
        &self,
        key: UnreadKey,
        recount: UnreadRecount,
    ) -> Result<bool, UnreadCounterError> {
        let mut values = self.values()?;
        if let Some(entry) = values.get(&key) {
            if !recount.supersedes(&entry.basis) {
                return Ok(false);
            }
        }
        values.insert(
            key,
            Entry {
                raw: recount.count.to_string(),
                basis: recount,
            },
        );
        Ok(true)
    }

    async fn clear(&self, key: UnreadKey) -> Result<(), UnreadCounterError> {
        self.values()?.remove(&key);
        Ok(())
    }
}
