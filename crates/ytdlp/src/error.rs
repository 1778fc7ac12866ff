use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy for a stream extraction attempt.
///
/// All variants surface to callers only after the retry policy is
/// exhausted; the final attempt's error is propagated unchanged.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The tool exited non-zero; carries its stderr output.
    #[error("yt-dlp error: {0}")]
    Tool(String),
    /// The tool did not exit within the hard wall-clock timeout.
    #[error("yt-dlp timed out after {0:?}")]
    Timeout(Duration),
    /// The tool exited zero but its stdout was not valid JSON.
    #[error("failed to parse yt-dlp output: {0}")]
    Parse(String),
    /// The tool reported success but no stream URL was present.
    #[error("no stream url available")]
    NoStreamAvailable,
    /// Spawning or reading the subprocess failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::Tool(_) => "tool",
            ExtractionError::Timeout(_) => "timeout",
            ExtractionError::Parse(_) => "parse",
            ExtractionError::NoStreamAvailable => "no_stream",
            ExtractionError::Io(_) => "io",
        }
    }
}
