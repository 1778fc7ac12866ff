//! Batch channel validation over the extraction pipeline.
//!
//! Validating a channel means trying to extract a stream from it. The
//! validator runs its own admission gate, independent of the extractor's
//! global one: extraction concurrency is a system-wide resource bound,
//! validation concurrency is a per-batch throughput choice, and the two
//! compose (effective concurrency is the smaller along the critical
//! path).

mod task_store;

pub use task_store::{TaskProgress, TaskState, ValidationTask, ValidationTaskStore};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use ytdlp_extractor::{ExtractionError, StreamExtractor};

/// Error-text markers that mean a channel is genuinely gone rather than
/// transiently failing.
const INVALID_CHANNEL_MARKERS: &[&str] = &[
    "not found",
    "unavailable",
    "not available",
    "no such file",
    "does not exist",
    "404",
    "channel not found",
];

const ERROR_MESSAGE_MAX_CHARS: usize = 100;

const DEFAULT_MAX_CONCURRENT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Error,
}

/// Outcome of validating one channel. Produced exactly once per input
/// item per run; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub url: String,
    pub status: ValidationStatus,
    pub error_message: Option<String>,
    pub validated_at: DateTime<Utc>,
}

/// Snapshot handed to the progress observer after each completed item.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub total: usize,
    pub validated: usize,
    pub current: String,
    pub status: ValidationStatus,
}

/// Injected progress sink, invoked synchronously on the validating task.
///
/// Implementers needing cross-thread delivery should forward into a
/// channel rather than touch caller state directly.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Size of the validator-local admission gate.
    pub max_concurrent: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Probes channels for availability by attempting extraction.
pub struct ChannelValidator<E> {
    extractor: Arc<E>,
    gate: Arc<Semaphore>,
    config: ValidatorConfig,
}

impl<E> ChannelValidator<E>
where
    E: StreamExtractor + 'static,
{
    pub fn new(extractor: Arc<E>) -> Self {
        Self::with_config(extractor, ValidatorConfig::default())
    }

    pub fn with_config(extractor: Arc<E>, config: ValidatorConfig) -> Self {
        Self {
            extractor,
            gate: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        }
    }

    /// Validate one channel. Infallible: every failure mode maps to a
    /// classified result.
    pub async fn validate_one(&self, url: &str) -> ValidationResult {
        let Ok(_permit) = self.gate.acquire().await else {
            return classify_failure(url, ExtractionError::Tool("validator gate closed".into()));
        };

        debug!("validating channel {url}");
        match self.extractor.extract(url).await {
            Ok(record) if !record.url.is_empty() => ValidationResult {
                url: url.to_string(),
                status: ValidationStatus::Valid,
                error_message: None,
                validated_at: Utc::now(),
            },
            Ok(_) => ValidationResult {
                url: url.to_string(),
                status: ValidationStatus::Invalid,
                error_message: Some("no playable stream returned".to_string()),
                validated_at: Utc::now(),
            },
            Err(err) => classify_failure(url, err),
        }
    }

    /// Validate many channels, invoking the observer once per completed
    /// item. Results come back in completion order, one per input; a
    /// per-item failure never escapes the batch. Callers needing
    /// positional correspondence must match by URL.
    pub async fn validate_many(
        &self,
        urls: &[String],
        observer: Option<&dyn ProgressObserver>,
    ) -> Vec<ValidationResult> {
        if urls.is_empty() {
            return Vec::new();
        }

        let total = urls.len();
        info!(
            "validating {total} channels, concurrency {}",
            self.config.max_concurrent
        );

        let mut pending: FuturesUnordered<_> =
            urls.iter().map(|url| self.validate_one(url)).collect();

        let mut results = Vec::with_capacity(total);
        while let Some(result) = pending.next().await {
            let validated = results.len() + 1;
            if let Some(observer) = observer {
                observer.on_progress(ProgressEvent {
                    total,
                    validated,
                    current: result.url.clone(),
                    status: result.status,
                });
            }
            debug!(
                "validated {validated}/{total}: {} ({:?})",
                result.url, result.status
            );
            results.push(result);
        }

        info!("validation finished: {}/{total}", results.len());
        results
    }
}

fn classify_failure(url: &str, err: ExtractionError) -> ValidationResult {
    let (status, message) = match err {
        ExtractionError::Timeout(_) => (ValidationStatus::Error, "validation timed out".to_string()),
        other => {
            let text = other.to_string();
            let lower = text.to_lowercase();
            if INVALID_CHANNEL_MARKERS.iter().any(|m| lower.contains(m)) {
                (ValidationStatus::Invalid, text)
            } else {
                (ValidationStatus::Error, text)
            }
        }
    };

    ValidationResult {
        url: url.to_string(),
        status,
        error_message: Some(truncate_message(&message)),
        validated_at: Utc::now(),
    }
}

fn truncate_message(message: &str) -> String {
    message.chars().take(ERROR_MESSAGE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_classifies_as_error() {
        let result = classify_failure(
            "https://x/live",
            ExtractionError::Timeout(Duration::from_secs(35)),
        );
        assert_eq!(result.status, ValidationStatus::Error);
        assert_eq!(result.error_message.as_deref(), Some("validation timed out"));
    }

    #[test]
    fn test_known_markers_classify_as_invalid() {
        for stderr in [
            "ERROR: This channel does not exist",
            "HTTP Error 404: Not Found",
            "Video unavailable",
        ] {
            let result = classify_failure("https://x/live", ExtractionError::Tool(stderr.into()));
            assert_eq!(result.status, ValidationStatus::Invalid, "stderr: {stderr}");
        }
    }

    #[test]
    fn test_unrecognized_failure_classifies_as_error() {
        let result = classify_failure(
            "https://x/live",
            ExtractionError::Tool("connection reset by peer".into()),
        );
        assert_eq!(result.status, ValidationStatus::Error);
    }

    #[test]
    fn test_error_message_is_truncated() {
        let long = "x".repeat(500);
        let result = classify_failure("https://x/live", ExtractionError::Tool(long));
        let message = result.error_message.unwrap();
        assert_eq!(message.chars().count(), ERROR_MESSAGE_MAX_CHARS);
    }
}
