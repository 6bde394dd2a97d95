use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, warn};

/// Key-value acceleration in front of the debt store. Never the source of
/// truth: a failing backend degrades to a miss on reads and a no-op on
/// writes, so the request path falls through to Postgres instead of erroring.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
    /// Sweep every key under an owner's namespace. Mutations derive an
    /// open-ended set of keys (filtered lists, aggregations), so
    /// invalidation goes by prefix rather than per key.
    async fn invalidate_prefix(&self, prefix: &str);
}

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "cache get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await {
            warn!(error = %e, key, "cache set failed");
        }
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        let pattern = format!("{prefix}*");
        let mut scan_conn = self.conn.clone();
        let keys: Vec<String> = match scan_conn.scan_match::<_, String>(&pattern).await {
            Ok(mut iter) => {
                let mut keys = Vec::new();
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                keys
            }
            Err(e) => {
                warn!(error = %e, pattern = %pattern, "cache scan failed, skipping invalidation");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        debug!(pattern = %pattern, count = keys.len(), "invalidating cached entries");
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!(error = %e, pattern = %pattern, "cache delete failed");
        }
    }
}

/// In-process cache used by tests and `AppState::fake()`.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        self.entries
            .lock()
            .expect("cache lock")
            .insert(key.to_string(), (value, deadline));
    }

    async fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .lock()
            .expect("cache lock")
            .retain(|key, _| !key.starts_with(prefix));
    }
}

/// Stands in when no REDIS_URL is configured or Redis is unreachable at
/// startup: every read misses, every write is dropped.
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    async fn invalidate_prefix(&self, _prefix: &str) {}
}
