//! Cache-aside stream resolution with cross-process single-flight locking.
//!
//! The lock turns "many callers miss the cache at once" into "one caller
//! extracts, the rest either find the fresh entry or make one extra
//! bounded attempt of their own". Losing the lock race never queues a
//! caller behind the holder: the external tool's latency is too variable
//! to wait on, so a loser backs off once, re-checks the cache, and then
//! extracts for itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use ytdlp_extractor::StreamExtractor;

use crate::cache::StreamCache;
use crate::channel::{Channel, ChannelStatus, OnlineStatus};
use crate::metrics::MetricsCollector;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Tunables for the single-flight protocol.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Expiry on the extraction lock; deadlock safety if a holder dies.
    pub lock_timeout: Duration,
    /// How long a lock-race loser waits before re-checking the cache.
    pub lock_retry_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_retry_delay: DEFAULT_LOCK_RETRY_DELAY,
        }
    }
}

/// Answers "what is the current stream URL for channel X".
pub struct StreamResolver<C, E> {
    cache: Arc<C>,
    extractor: Arc<E>,
    metrics: Arc<MetricsCollector>,
    config: ResolverConfig,
}

impl<C, E> Clone for StreamResolver<C, E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            extractor: self.extractor.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C, E> StreamResolver<C, E>
where
    C: StreamCache + 'static,
    E: StreamExtractor + 'static,
{
    pub fn new(cache: Arc<C>, extractor: Arc<E>, metrics: Arc<MetricsCollector>) -> Self {
        Self::with_config(cache, extractor, metrics, ResolverConfig::default())
    }

    pub fn with_config(
        cache: Arc<C>,
        extractor: Arc<E>,
        metrics: Arc<MetricsCollector>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            extractor,
            metrics,
            config,
        }
    }

    /// Resolve a channel to a playable stream URL.
    ///
    /// Absent means "channel currently unavailable"; no cache or
    /// extraction failure propagates past this layer.
    pub async fn resolve(
        &self,
        channel_url: &str,
        channel_name: &str,
        use_cache: bool,
    ) -> Option<String> {
        let started = Instant::now();

        if use_cache {
            if let Some(record) = self.cache.get_stream(channel_name).await {
                if !record.is_expired() {
                    debug!("serving {channel_name} from cache");
                    self.metrics.record_cache_hit();
                    return Some(record.url);
                }
                debug!("cache entry for {channel_name} expired, evicting");
                self.cache.invalidate(channel_name).await;
            }
            self.metrics.record_cache_miss();
        }

        let lock_acquired = self
            .cache
            .try_acquire_lock(channel_name, self.config.lock_timeout)
            .await;

        if !lock_acquired {
            // Another resolver is extracting this channel. Wait once for
            // its result, then attempt our own extraction rather than
            // queueing behind a holder that may be slow or dead.
            info!("waiting on in-flight extraction for {channel_name}");
            tokio::time::sleep(self.config.lock_retry_delay).await;

            if let Some(record) = self.cache.get_stream(channel_name).await {
                if !record.is_expired() {
                    return Some(record.url);
                }
            }
        }

        let result = self
            .extract_and_store(channel_url, channel_name, started)
            .await;

        if lock_acquired {
            self.cache.release_lock(channel_name).await;
        }

        result
    }

    async fn extract_and_store(
        &self,
        channel_url: &str,
        channel_name: &str,
        started: Instant,
    ) -> Option<String> {
        match self.extractor.extract(channel_url).await {
            Ok(record) => {
                self.cache.set_stream(channel_name, &record, None).await;
                self.metrics.record_extraction_success(started.elapsed());
                info!("resolved stream for {channel_name}");
                Some(record.url)
            }
            Err(err) => {
                self.metrics.record_extraction_failure(err.kind());
                error!("failed to resolve stream for {channel_name}: {err}");
                None
            }
        }
    }

    /// Resolve a list of channels one at a time, reporting per-channel
    /// online/offline status.
    pub async fn refresh_many(&self, channels: &[Channel]) -> Vec<ChannelStatus> {
        let mut results = Vec::with_capacity(channels.len());

        for channel in channels {
            let stream_url = self.resolve(&channel.url, &channel.name, true).await;
            let status = if stream_url.is_some() {
                OnlineStatus::Online
            } else {
                OnlineStatus::Offline
            };

            results.push(ChannelStatus {
                name: channel.name.clone(),
                url: channel.url.clone(),
                stream_url,
                status,
                last_checked: Utc::now(),
            });
        }

        results
    }

    /// Resolve all channels concurrently, keeping only what completes
    /// before the deadline. Unfinished resolutions are aborted and
    /// discarded, not retried.
    pub async fn resolve_many_with_deadline(
        &self,
        channels: &[Channel],
        deadline: Duration,
    ) -> HashMap<String, Option<String>> {
        let until = tokio::time::Instant::now() + deadline;

        let mut tasks = JoinSet::new();
        for channel in channels {
            let resolver = self.clone();
            let channel = channel.clone();
            tasks.spawn(async move {
                let url = resolver.resolve(&channel.url, &channel.name, true).await;
                (channel.name, url)
            });
        }

        let mut resolved = HashMap::new();
        while !tasks.is_empty() {
            match tokio::time::timeout_at(until, tasks.join_next()).await {
                Ok(Some(Ok((name, url)))) => {
                    resolved.insert(name, url);
                }
                Ok(Some(Err(err))) => warn!("resolution task failed: {err}"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "deadline reached with {} resolutions outstanding, discarding",
                        tasks.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        resolved
    }

    /// Drop a channel's cached record (outward API for the HTTP layer).
    pub async fn invalidate(&self, channel_name: &str) -> bool {
        info!("invalidating cached stream for {channel_name}");
        self.cache.invalidate(channel_name).await
    }

    /// Names of all channels currently cached.
    pub async fn cached_channel_names(&self) -> Vec<String> {
        self.cache.cached_channels().await
    }
}
