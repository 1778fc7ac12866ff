//! Stream extraction through the external `yt-dlp` tool.
//!
//! Resolving a live channel URL into a playable stream URL is slow and
//! flaky: it spawns a subprocess that talks to the upstream platform. This
//! crate bounds that cost with a global admission gate, retries transient
//! failures with exponential backoff, and surfaces a typed failure taxonomy
//! so callers can tell "channel is gone" from "tool hiccup".

pub mod error;
pub mod extractor;
pub mod record;
pub mod retry;

pub use error::ExtractionError;
pub use extractor::{StreamExtractor, YtdlpConfig, YtdlpExtractor};
pub use record::{StreamFormat, StreamProtocol, StreamRecord};
pub use retry::{RetryConfig, retry_with_backoff};
