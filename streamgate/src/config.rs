//! Environment-driven application settings.
//!
//! Every knob has a default matching the deployed service; values are read
//! once at startup (after `dotenvy` has loaded `.env`).

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
/// Store-side TTL backstop for cached stream records (6 hours).
const DEFAULT_CACHE_TTL_SECS: u64 = 21_600;
const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOCK_RETRY_DELAY_SECS: u64 = 2;
const DEFAULT_YTDLP_BINARY: &str = "yt-dlp";
const DEFAULT_YTDLP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_YTDLP_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 3;
const DEFAULT_MAX_CONCURRENT_VALIDATIONS: usize = 3;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub redis_url: String,
    pub cache_ttl: Duration,
    pub lock_timeout: Duration,
    pub lock_retry_delay: Duration,
    pub ytdlp_binary: String,
    pub ytdlp_timeout: Duration,
    pub ytdlp_max_retries: u32,
    pub ytdlp_proxy: Option<String>,
    pub max_concurrent_extractions: usize,
    pub max_concurrent_validations: usize,
    /// Explicit tracing filter; `RUST_LOG` applies when unset.
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            lock_retry_delay: Duration::from_secs(DEFAULT_LOCK_RETRY_DELAY_SECS),
            ytdlp_binary: DEFAULT_YTDLP_BINARY.to_string(),
            ytdlp_timeout: Duration::from_secs(DEFAULT_YTDLP_TIMEOUT_SECS),
            ytdlp_max_retries: DEFAULT_YTDLP_MAX_RETRIES,
            ytdlp_proxy: None,
            max_concurrent_extractions: DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
            max_concurrent_validations: DEFAULT_MAX_CONCURRENT_VALIDATIONS,
            log_filter: None,
        }
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();

        Ok(Settings {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_TTL",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            lock_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LOCK_TIMEOUT",
                DEFAULT_LOCK_TIMEOUT_SECS,
            )?),
            lock_retry_delay: Duration::from_secs(parse_or(
                &lookup,
                "LOCK_RETRY_DELAY",
                DEFAULT_LOCK_RETRY_DELAY_SECS,
            )?),
            ytdlp_binary: lookup("YTDLP_PATH").unwrap_or(defaults.ytdlp_binary),
            ytdlp_timeout: Duration::from_secs(parse_or(
                &lookup,
                "YTDLP_TIMEOUT",
                DEFAULT_YTDLP_TIMEOUT_SECS,
            )?),
            ytdlp_max_retries: parse_or(&lookup, "YTDLP_MAX_RETRIES", DEFAULT_YTDLP_MAX_RETRIES)?,
            ytdlp_proxy: lookup("YTDLP_PROXY").filter(|v| !v.is_empty()),
            max_concurrent_extractions: parse_or(
                &lookup,
                "MAX_CONCURRENT_YTDLP_REQUESTS",
                DEFAULT_MAX_CONCURRENT_EXTRACTIONS,
            )?,
            max_concurrent_validations: parse_or(
                &lookup,
                "MAX_CONCURRENT_VALIDATIONS",
                DEFAULT_MAX_CONCURRENT_VALIDATIONS,
            )?,
            log_filter: lookup("LOG_FILTER").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("invalid {key} value {raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(settings.cache_ttl, Duration::from_secs(21_600));
        assert_eq!(settings.ytdlp_max_retries, 3);
        assert_eq!(settings.max_concurrent_extractions, 3);
        assert!(settings.ytdlp_proxy.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache:6379/1"),
            ("CACHE_TTL", "600"),
            ("YTDLP_PROXY", "socks5://127.0.0.1:1080"),
            ("MAX_CONCURRENT_YTDLP_REQUESTS", "5"),
        ]))
        .unwrap();

        assert_eq!(settings.redis_url, "redis://cache:6379/1");
        assert_eq!(settings.cache_ttl, Duration::from_secs(600));
        assert_eq!(
            settings.ytdlp_proxy.as_deref(),
            Some("socks5://127.0.0.1:1080")
        );
        assert_eq!(settings.max_concurrent_extractions, 5);
    }

    #[test]
    fn test_invalid_value_is_a_configuration_error() {
        let err = Settings::from_lookup(lookup_from(&[("CACHE_TTL", "six hours")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn test_empty_proxy_treated_as_unset() {
        let settings = Settings::from_lookup(lookup_from(&[("YTDLP_PROXY", "")])).unwrap();
        assert!(settings.ytdlp_proxy.is_none());
    }
}
