//! Resolved stream records produced by a successful extraction.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an extracted stream URL is assumed to stay playable, in
/// seconds.
///
/// The upstream source rotates its stream URLs roughly hourly; the tool
/// does not report an expiry, so this is a policy constant.
pub const STREAM_URL_LIFETIME_SECS: i64 = 3600;

/// Container format of a stream, derived from its URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    Dash,
    #[default]
    Unknown,
}

impl StreamFormat {
    /// HLS manifest suffix in the URL means HLS; everything else the
    /// source hands out is DASH.
    pub fn from_url(url: &str) -> Self {
        if url.contains(".m3u8") {
            StreamFormat::Hls
        } else {
            StreamFormat::Dash
        }
    }
}

/// Transport scheme of a stream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Http,
    Https,
}

impl StreamProtocol {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("https") {
            StreamProtocol::Https
        } else {
            StreamProtocol::Http
        }
    }
}

/// A resolved playable stream URL plus its metadata.
///
/// Immutable once created; a later extraction supersedes it rather than
/// mutating it. After `expires_at` the record is stale even if a cache
/// still physically holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    pub url: String,
    pub quality: String,
    pub format: StreamFormat,
    pub protocol: StreamProtocol,
    /// The channel URL this stream was extracted from.
    pub channel_url: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StreamRecord {
    /// Build a record for a freshly extracted stream URL, deriving format
    /// and protocol from the URL and stamping the expiry policy.
    pub fn new(
        url: impl Into<String>,
        quality: impl Into<String>,
        channel_url: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let now = Utc::now();
        Self {
            format: StreamFormat::from_url(&url),
            protocol: StreamProtocol::from_url(&url),
            url,
            quality: quality.into(),
            channel_url: channel_url.into(),
            fetched_at: now,
            expires_at: now + Duration::seconds(STREAM_URL_LIFETIME_SECS),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_derived_from_url() {
        assert_eq!(
            StreamFormat::from_url("https://x/live/stream.m3u8?t=1"),
            StreamFormat::Hls
        );
        assert_eq!(
            StreamFormat::from_url("https://x/live/manifest.mpd"),
            StreamFormat::Dash
        );
    }

    #[test]
    fn test_protocol_derived_from_url() {
        assert_eq!(
            StreamProtocol::from_url("https://x/stream.m3u8"),
            StreamProtocol::Https
        );
        assert_eq!(
            StreamProtocol::from_url("http://x/stream.m3u8"),
            StreamProtocol::Http
        );
    }

    #[test]
    fn test_fresh_record_not_expired() {
        let record = StreamRecord::new("https://x/stream.m3u8", "best", "https://src/live");
        assert!(!record.is_expired());
        assert_eq!(record.format, StreamFormat::Hls);
        assert!(record.expires_at > record.fetched_at);
    }

    #[test]
    fn test_record_serializes_lowercase_enums() {
        let record = StreamRecord::new("https://x/stream.m3u8", "best", "https://src/live");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["format"], "hls");
        assert_eq!(value["protocol"], "https");
        assert_eq!(value["url"], "https://x/stream.m3u8");
    }
}
