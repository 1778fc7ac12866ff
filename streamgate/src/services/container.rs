//! Service container wiring configuration into the running services.

use std::sync::Arc;

use tracing::info;
use ytdlp_extractor::{RetryConfig, YtdlpConfig, YtdlpExtractor};

use crate::Result;
use crate::cache::RedisStreamCache;
use crate::config::Settings;
use crate::metrics::MetricsCollector;
use crate::resolver::{ResolverConfig, StreamResolver};
use crate::validator::{ChannelValidator, ValidationTaskStore, ValidatorConfig};

/// Holds every application service, fully wired.
pub struct ServiceContainer {
    pub settings: Settings,
    pub cache: Arc<RedisStreamCache>,
    pub extractor: Arc<YtdlpExtractor>,
    pub resolver: StreamResolver<RedisStreamCache, YtdlpExtractor>,
    pub validator: Arc<ChannelValidator<YtdlpExtractor>>,
    pub task_store: Arc<ValidationTaskStore>,
    pub metrics: Arc<MetricsCollector>,
}

impl ServiceContainer {
    /// Build all services and run the startup probes (tool availability,
    /// store connectivity). Either probe failing is fatal here; after
    /// startup the cache degrades gracefully instead.
    pub async fn new(settings: Settings) -> Result<Self> {
        info!("initializing services");

        let extractor = Arc::new(YtdlpExtractor::new(YtdlpConfig {
            binary_path: settings.ytdlp_binary.clone(),
            socket_timeout: settings.ytdlp_timeout,
            proxy: settings.ytdlp_proxy.clone(),
            max_concurrent: settings.max_concurrent_extractions,
            retry: RetryConfig {
                max_retries: settings.ytdlp_max_retries,
                ..RetryConfig::default()
            },
        }));
        extractor.verify_binary().await?;

        let cache = Arc::new(
            RedisStreamCache::connect(&settings.redis_url, settings.cache_ttl).await?,
        );

        let metrics = Arc::new(MetricsCollector::new());

        let resolver = StreamResolver::with_config(
            cache.clone(),
            extractor.clone(),
            metrics.clone(),
            ResolverConfig {
                lock_timeout: settings.lock_timeout,
                lock_retry_delay: settings.lock_retry_delay,
            },
        );

        let validator = Arc::new(ChannelValidator::with_config(
            extractor.clone(),
            ValidatorConfig {
                max_concurrent: settings.max_concurrent_validations,
            },
        ));

        let task_store = Arc::new(ValidationTaskStore::new());

        Ok(Self {
            settings,
            cache,
            extractor,
            resolver,
            validator,
            task_store,
            metrics,
        })
    }
}
