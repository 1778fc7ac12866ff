//! Bounded retry with exponential backoff and jitter.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_base: f64,
    /// Whether to scale delays by a uniform random factor in [0.5, 1.5).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after the failure with the given 0-based index.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff = self.initial_delay_ms as f64 * self.backoff_base.powi(attempt as i32);
        let capped = backoff.min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            capped * (0.5 + rand::random::<f64>())
        } else {
            capped
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Run `op` up to `max_retries + 1` times, sleeping between attempts.
///
/// Each attempt is a fresh invocation; no partial state carries over. The
/// error from the final attempt is returned unchanged so callers can
/// inspect its original kind.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    op_name: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_retries {
                    warn!("{op_name} failed after {} attempts: {err}", attempt + 1);
                    return Err(err);
                }

                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{op_name} attempt {}/{} failed: {err}, retrying in {:?}",
                    attempt + 1,
                    config.max_retries + 1,
                    delay
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            backoff_base: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_delay_grows_exponentially_and_caps() {
        let config = RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10000,
            backoff_base: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(10000));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig {
            max_retries: 1,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_base: 2.0,
            jitter: true,
        };

        for _ in 0..100 {
            let delay = config.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(500), "delay {delay:?} below jitter floor");
            assert!(delay < Duration::from_millis(1500), "delay {delay:?} above jitter ceiling");
        }
    }

    #[tokio::test]
    async fn test_max_retries_bounds_attempts_and_surfaces_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff(&fast_config(2), "test op", || {
            let calls = &calls;
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n} failed"))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "attempt 3 failed");
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = retry_with_backoff(&fast_config(3), "test op", || {
            let calls = &calls;
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err("transient".to_string()) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_skips_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<&str, String> = retry_with_backoff(&fast_config(3), "test op", || {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
