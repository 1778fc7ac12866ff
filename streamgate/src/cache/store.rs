//! Redis-backed implementation of the stream cache.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};
use ytdlp_extractor::StreamRecord;

use crate::Result;

use super::{STREAM_KEY_PREFIX, StreamCache, lock_key, stream_key};

/// Value stored under a lock key; only the key's existence matters.
const LOCK_SENTINEL: &str = "1";

/// Stream cache over a shared Redis store.
///
/// The connection manager reconnects on its own, so a store outage shows
/// up as failed operations (absorbed per the [`StreamCache`] contract)
/// rather than a poisoned client.
#[derive(Clone)]
pub struct RedisStreamCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl RedisStreamCache {
    /// Connect to the store and verify it responds.
    ///
    /// Startup is the one place a store failure is fatal; afterwards every
    /// operation degrades gracefully.
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        info!("cache store connection established");

        Ok(Self { conn, default_ttl })
    }

    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }
}

#[async_trait]
impl StreamCache for RedisStreamCache {
    async fn get_stream(&self, channel: &str) -> Option<StreamRecord> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(stream_key(channel)).await {
            Ok(value) => value,
            Err(e) => {
                warn!("cache read failed for {channel}: {e}");
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(record) => {
                debug!("cache hit for {channel}");
                Some(record)
            }
            Err(e) => {
                warn!("discarding undecodable cache entry for {channel}: {e}");
                None
            }
        }
    }

    async fn set_stream(
        &self,
        channel: &str,
        record: &StreamRecord,
        ttl: Option<Duration>,
    ) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode stream record for {channel}: {e}");
                return false;
            }
        };

        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<()> = conn
            .set_ex(stream_key(channel), payload, ttl.as_secs())
            .await;

        match reply {
            Ok(()) => {
                debug!("cached stream for {channel} (ttl {}s)", ttl.as_secs());
                true
            }
            Err(e) => {
                warn!("cache write failed for {channel}: {e}");
                false
            }
        }
    }

    async fn invalidate(&self, channel: &str) -> bool {
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<i64> = conn.del(stream_key(channel)).await;
        match reply {
            Ok(_) => {
                debug!("cache entry cleared for {channel}");
                true
            }
            Err(e) => {
                warn!("cache invalidation failed for {channel}: {e}");
                false
            }
        }
    }

    async fn try_acquire_lock(&self, channel: &str, timeout: Duration) -> bool {
        let mut conn = self.conn.clone();
        // SET NX EX: created only when absent, auto-released via TTL if
        // the holder crashes.
        let reply: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(lock_key(channel))
            .arg(LOCK_SENTINEL)
            .arg("NX")
            .arg("EX")
            .arg(timeout.as_secs())
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!("lock acquisition failed for {channel}: {e}");
                false
            }
        }
    }

    async fn release_lock(&self, channel: &str) -> bool {
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<i64> = conn.del(lock_key(channel)).await;
        match reply {
            Ok(_) => true,
            Err(e) => {
                // A stuck lock self-heals via its TTL.
                warn!("lock release failed for {channel}: {e}");
                false
            }
        }
    }

    async fn cached_channels(&self) -> Vec<String> {
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<Vec<String>> =
            conn.keys(format!("{STREAM_KEY_PREFIX}*")).await;

        match reply {
            Ok(keys) => keys
                .iter()
                .filter_map(|key| key.strip_prefix(STREAM_KEY_PREFIX))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!("cache key listing failed: {e}");
                Vec::new()
            }
        }
    }
}
