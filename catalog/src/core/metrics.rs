//! Loader metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for namespace loads.
pub struct LoaderMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    /// Callers that joined a load already in flight.
    joined: AtomicU64,
    /// Stale operations served because a refresh failed.
    stale_served: AtomicU64,
    latency: LatencyStats,
}

impl LoaderMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
            latency: LatencyStats::new(),
        }
    }

    /// Record a lookup served from the cache.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup that had to go upstream.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a caller joining a load already in flight.
    pub fn record_joined(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    /// Record stale operations served after a failed refresh.
    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished upstream fetch.
    pub fn record_load(&self, success: bool, duration_ms: u64) {
        if success {
            self.loads.fetch_add(1, Ordering::Relaxed);
            self.latency.record(duration_ms);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of the counters.
    pub fn snapshot(&self) -> LoaderMetricsSnapshot {
        LoaderMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            latency: self.latency.snapshot(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.joined.store(0, Ordering::Relaxed);
        self.stale_served.store(0, Ordering::Relaxed);
        self.latency.reset();
    }
}

impl Default for LoaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Load latency statistics.
struct LatencyStats {
    count: AtomicU64,
    total_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
        }
    }

    fn record(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.min_ms.fetch_min(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total_ms.store(0, Ordering::Relaxed);
        self.min_ms.store(u64::MAX, Ordering::Relaxed);
        self.max_ms.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total = self.total_ms.load(Ordering::Relaxed);
        let min = self.min_ms.load(Ordering::Relaxed);
        let max = self.max_ms.load(Ordering::Relaxed);

        LatencySnapshot {
            count,
            avg_ms: if count > 0 { total / count } else { 0 },
            min_ms: if min == u64::MAX { 0 } else { min },
            max_ms: max,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub failures: u64,
    pub joined: u64,
    pub stale_served: u64,
    pub latency: LatencySnapshot,
}

impl LoaderMetricsSnapshot {
    /// Hit rate as a percentage of all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySnapshot {
    pub count: u64,
    pub avg_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = LoaderMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_joined();
        metrics.record_load(true, 10);
        metrics.record_load(false, 99);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.joined, 1);
        assert_eq!(snapshot.loads, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.hit_rate(), 75.0);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = LoaderMetrics::new();
        metrics.record_load(true, 100);
        metrics.record_load(true, 50);
        metrics.record_load(true, 150);

        let latency = metrics.snapshot().latency;
        assert_eq!(latency.count, 3);
        assert_eq!(latency.avg_ms, 100);
        assert_eq!(latency.min_ms, 50);
        assert_eq!(latency.max_ms, 150);
    }

    #[test]
    fn test_reset() {
        let metrics = LoaderMetrics::new();
        metrics.record_hit();
        metrics.record_load(true, 20);
        metrics.record_stale_served();
        metrics.reset();

        assert_eq!(metrics.snapshot(), LoaderMetricsSnapshot::default());
        assert_eq!(metrics.snapshot().hit_rate(), 0.0);
    }
}
