use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::render::OutputFormat;

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub allowed_requests: u64,
    pub throttled_requests: u64,
    pub raster_rendered: u64,
    pub vector_rendered: u64,
    pub upstream_failures: u64,
    pub since: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total_requests: AtomicU64,
    allowed_requests: AtomicU64,
    throttled_requests: AtomicU64,
    raster_rendered: AtomicU64,
    vector_rendered: AtomicU64,
    upstream_failures: AtomicU64,
}

/// Process-wide request counters. Cheap to clone; clones share counters.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    counters: Arc<Counters>,
    since: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            since: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn record_admission(&self, allowed: bool) {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.counters.allowed_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.throttled_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_render(&self, format: OutputFormat) {
        let counter = match format {
            OutputFormat::Raster => &self.counters.raster_rendered,
            OutputFormat::Vector => &self.counters.vector_rendered,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.counters.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            total_requests: c.total_requests.load(Ordering::Relaxed),
            allowed_requests: c.allowed_requests.load(Ordering::Relaxed),
            throttled_requests: c.throttled_requests.load(Ordering::Relaxed),
            raster_rendered: c.raster_rendered.load(Ordering::Relaxed),
            vector_rendered: c.vector_rendered.load(Ordering::Relaxed),
            upstream_failures: c.upstream_failures.load(Ordering::Relaxed),
            since: self.since,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsCollector::new();
        metrics.record_admission(true);
        metrics.record_admission(true);
        metrics.record_admission(false);
        metrics.record_render(OutputFormat::Vector);
        metrics.record_upstream_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.allowed_requests, 2);
        assert_eq!(snapshot.throttled_requests, 1);
        assert_eq!(snapshot.vector_rendered, 1);
        assert_eq!(snapshot.raster_rendered, 0);
        assert_eq!(snapshot.upstream_failures, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MetricsCollector::new();
        metrics.clone().record_render(OutputFormat::Raster);
        assert_eq!(metrics.snapshot().raster_rendered, 1);
    }
}
