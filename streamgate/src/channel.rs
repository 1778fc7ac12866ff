//! Channel domain types shared by the resolver and the validator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named external live-video source.
///
/// Owned by the external channel registry; the core only reads the
/// `(name, url)` pair and never mutates it. The name is the stable cache
/// key for the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub url: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Offline,
}

/// Per-channel outcome of a batch refresh.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub url: String,
    pub stream_url: Option<String>,
    pub status: OnlineStatus,
    pub last_checked: DateTime<Utc>,
}
