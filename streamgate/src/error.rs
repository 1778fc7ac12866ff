//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
///
/// Lock contention is deliberately not a variant: failing to take the
/// extraction lock is an expected outcome and is reported as a boolean by
/// the cache layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cache store unavailable: {0}")]
    CacheUnavailable(#[from] redis::RedisError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ytdlp_extractor::ExtractionError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation task not found: {0}")]
    TaskNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
