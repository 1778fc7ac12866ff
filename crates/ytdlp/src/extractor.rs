//! `yt-dlp` subprocess invocation behind a global admission gate.
//!
//! The gate bounds how many extraction subprocesses run at once across the
//! whole process; callers past the limit suspend until a slot frees. The
//! gate is process-local: under horizontal scale-out, total tool
//! concurrency is `max_concurrent × process count`.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::record::StreamRecord;
use crate::retry::{RetryConfig, retry_with_backoff};

const DEFAULT_BINARY: &str = "yt-dlp";

/// Grace period on top of the tool's socket timeout before the subprocess
/// is killed outright.
const PROCESS_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the `yt-dlp` extractor.
#[derive(Debug, Clone)]
pub struct YtdlpConfig {
    /// Path to the `yt-dlp` binary.
    pub binary_path: String,
    /// Socket timeout passed to the tool; the hard process timeout adds a
    /// small grace on top.
    pub socket_timeout: Duration,
    /// Optional proxy URL forwarded to the tool.
    pub proxy: Option<String>,
    /// Size of the global extraction admission gate.
    pub max_concurrent: usize,
    /// Retry policy for transient tool failures.
    pub retry: RetryConfig,
}

impl Default for YtdlpConfig {
    fn default() -> Self {
        Self {
            binary_path: DEFAULT_BINARY.to_string(),
            socket_timeout: Duration::from_secs(30),
            proxy: None,
            max_concurrent: 3,
            retry: RetryConfig::default(),
        }
    }
}

/// The extraction seam consumed by the resolver and the validator.
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    async fn extract(&self, channel_url: &str) -> Result<StreamRecord, ExtractionError>;
}

/// Extracts playable stream URLs by invoking `yt-dlp` as a subprocess.
pub struct YtdlpExtractor {
    config: YtdlpConfig,
    gate: Arc<Semaphore>,
    client: reqwest::Client,
}

impl YtdlpExtractor {
    pub fn new(config: YtdlpConfig) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Startup probe: run `yt-dlp --version` and return the version string.
    pub async fn verify_binary(&self) -> Result<String, ExtractionError> {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let out = match timeout(VERSION_CHECK_TIMEOUT, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ExtractionError::Timeout(VERSION_CHECK_TIMEOUT)),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            return Err(ExtractionError::Tool(stderr));
        }

        let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
        info!("yt-dlp available: {version}");
        Ok(version)
    }

    /// One extraction attempt: spawn the tool, enforce the hard timeout,
    /// parse its JSON output into a record.
    async fn run_once(&self, channel_url: &str) -> Result<StreamRecord, ExtractionError> {
        let socket_timeout_secs = self.config.socket_timeout.as_secs().to_string();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.args(["-f", "best", "-j"])
            .args(["--socket-timeout", &socket_timeout_secs])
            .args(["--no-warnings", "-q"]);

        if let Some(proxy) = &self.config.proxy {
            cmd.args(["--proxy", proxy]);
        }

        cmd.arg(channel_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let hard_timeout = self.config.socket_timeout + PROCESS_TIMEOUT_GRACE;
        let out = match timeout(hard_timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ExtractionError::Timeout(hard_timeout)),
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            return Err(ExtractionError::Tool(stderr));
        }

        let info: YtdlpOutput = serde_json::from_slice(&out.stdout)
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let stream_url = info
            .stream_url()
            .ok_or(ExtractionError::NoStreamAvailable)?;
        let quality = info.format.unwrap_or_else(|| "unknown".to_string());

        Ok(StreamRecord::new(stream_url, quality, channel_url))
    }

    /// Lightweight liveness probe for an already-extracted stream URL.
    ///
    /// HEAD request; success is any status below 400. Never errors.
    pub async fn probe(&self, stream_url: &str) -> bool {
        let response = self
            .client
            .head(stream_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let alive = resp.status().as_u16() < 400;
                if !alive {
                    warn!("stream probe returned {}", resp.status());
                }
                alive
            }
            Err(e) => {
                warn!("stream probe failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl StreamExtractor for YtdlpExtractor {
    async fn extract(&self, channel_url: &str) -> Result<StreamRecord, ExtractionError> {
        // Held across all retry attempts: one gate slot covers the whole
        // logical extraction, not each subprocess spawn.
        let Ok(_permit) = self.gate.acquire().await else {
            return Err(ExtractionError::Tool("extraction gate closed".to_string()));
        };

        debug!("extracting stream for {channel_url}");
        retry_with_backoff(&self.config.retry, "yt-dlp extraction", || {
            self.run_once(channel_url)
        })
        .await
    }
}

/// The subset of the tool's JSON output we consume.
#[derive(Debug, Deserialize)]
struct YtdlpOutput {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    formats: Vec<YtdlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtdlpFormat {
    #[serde(default)]
    url: Option<String>,
}

impl YtdlpOutput {
    /// Stream URL: top-level `url`, falling back to the first formats
    /// entry. Empty strings count as absent.
    fn stream_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.formats.first().and_then(|f| f.url.clone()))
            .filter(|u| !u.is_empty())
    }
}
