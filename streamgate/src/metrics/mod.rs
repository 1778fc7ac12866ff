//! Process-local counters for resolution and extraction outcomes.
//!
//! Export to an external system is out of scope; the collector only keeps
//! the counts and hands out a serializable snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct MetricsCollector {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    extraction_success: AtomicU64,
    extraction_failure: AtomicU64,
    extraction_duration_total_ms: AtomicU64,
    extraction_errors: DashMap<&'static str, u64>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction_success(&self, duration: Duration) {
        self.extraction_success.fetch_add(1, Ordering::Relaxed);
        self.extraction_duration_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_extraction_failure(&self, kind: &'static str) {
        self.extraction_failure.fetch_add(1, Ordering::Relaxed);
        *self.extraction_errors.entry(kind).or_insert(0) += 1;
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        if hits + misses == 0 {
            return 0.0;
        }
        hits as f64 / (hits + misses) as f64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let success = self.extraction_success.load(Ordering::Relaxed);
        let duration_total_ms = self.extraction_duration_total_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: self.cache_hit_rate(),
            extraction_success: success,
            extraction_failure: self.extraction_failure.load(Ordering::Relaxed),
            avg_extraction_ms: if success == 0 {
                0.0
            } else {
                duration_total_ms as f64 / success as f64
            },
            extraction_errors: self
                .extraction_errors
                .iter()
                .map(|entry| (entry.key().to_string(), *entry.value()))
                .collect(),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub extraction_success: u64,
    pub extraction_failure: u64,
    pub avg_extraction_ms: f64,
    pub extraction_errors: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let metrics = MetricsCollector::new();
        assert_eq!(metrics.cache_hit_rate(), 0.0);

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        assert_eq!(metrics.cache_hit_rate(), 0.75);
    }

    #[test]
    fn test_extraction_counters() {
        let metrics = MetricsCollector::new();
        metrics.record_extraction_success(Duration::from_millis(200));
        metrics.record_extraction_success(Duration::from_millis(400));
        metrics.record_extraction_failure("timeout");
        metrics.record_extraction_failure("timeout");
        metrics.record_extraction_failure("tool");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.extraction_success, 2);
        assert_eq!(snapshot.extraction_failure, 3);
        assert_eq!(snapshot.avg_extraction_ms, 300.0);
        assert_eq!(snapshot.extraction_errors.get("timeout"), Some(&2));
        assert_eq!(snapshot.extraction_errors.get("tool"), Some(&1));
    }
}
