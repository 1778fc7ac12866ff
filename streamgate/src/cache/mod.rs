//! Stream cache and cross-process extraction lock.
//!
//! The store doubles as a mutual-exclusion primitive: a lock is a key
//! created only-if-absent with an expiry, so a crashed holder self-heals
//! via TTL. Both namespaces are shared by every resolver instance,
//! including across separate processes and machines, which is why the lock
//! rides the store's atomic create-if-absent rather than any in-process
//! mutex.

mod store;

pub use store::RedisStreamCache;

use std::time::Duration;

use async_trait::async_trait;
use ytdlp_extractor::StreamRecord;

pub const STREAM_KEY_PREFIX: &str = "stream:";
pub const LOCK_KEY_PREFIX: &str = "lock:";

pub(crate) fn stream_key(channel: &str) -> String {
    format!("{STREAM_KEY_PREFIX}{channel}")
}

pub(crate) fn lock_key(channel: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{channel}")
}

/// Cache seam consumed by the resolver.
///
/// Every operation degrades gracefully: a store-connectivity failure is an
/// absent/false result, never an error, so the resolver can fall through
/// to direct extraction while the store is down.
#[async_trait]
pub trait StreamCache: Send + Sync {
    /// Cached record for a channel; absent on miss, lapsed store TTL, or
    /// store failure. Freshness (`expires_at`) is the caller's check.
    async fn get_stream(&self, channel: &str) -> Option<StreamRecord>;

    /// Upsert a record with the given TTL (store default when `None`).
    async fn set_stream(
        &self,
        channel: &str,
        record: &StreamRecord,
        ttl: Option<Duration>,
    ) -> bool;

    /// Unconditionally delete a channel's cache entry.
    async fn invalidate(&self, channel: &str) -> bool;

    /// Atomic create-if-absent with expiry; true iff this call created the
    /// lock. Not reentrant: a holder re-acquiring gets false.
    async fn try_acquire_lock(&self, channel: &str, timeout: Duration) -> bool;

    /// Unconditionally delete the lock key. Idempotent; safe to call when
    /// the lock expired or was never held.
    async fn release_lock(&self, channel: &str) -> bool;

    /// Names of all channels with a live cache entry.
    async fn cached_channels(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixes() {
        assert_eq!(stream_key("news-24"), "stream:news-24");
        assert_eq!(lock_key("news-24"), "lock:news-24");
    }
}
