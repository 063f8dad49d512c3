//! Metrics for cache decision paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Thread-safe counters over the orchestrator's decision paths.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    /// Served from the freshness hint + store, zero upstream calls
    freshness_hits: Arc<AtomicU64>,
    /// Served from the store after an upstream resolve
    store_hits: Arc<AtomicU64>,
    /// Upstream "latest version" resolutions attempted
    upstream_resolves: Arc<AtomicU64>,
    /// Upstream content fetches performed
    upstream_fetches: Arc<AtomicU64>,
    /// Stale snapshots served because the upstream was unavailable
    stale_fallbacks: Arc<AtomicU64>,
    /// Snapshot writes that failed and were swallowed
    store_write_failures: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_freshness_hit(&self) {
        self.freshness_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_resolve(&self) {
        self.upstream_resolves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_fetch(&self) {
        self.upstream_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_fallback(&self) {
        self.stale_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_write_failure(&self) {
        self.store_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            freshness_hits: self.freshness_hits.load(Ordering::Relaxed),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            upstream_resolves: self.upstream_resolves.load(Ordering::Relaxed),
            upstream_fetches: self.upstream_fetches.load(Ordering::Relaxed),
            stale_fallbacks: self.stale_fallbacks.load(Ordering::Relaxed),
            store_write_failures: self.store_write_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.freshness_hits.store(0, Ordering::Relaxed);
        self.store_hits.store(0, Ordering::Relaxed);
        self.upstream_resolves.store(0, Ordering::Relaxed);
        self.upstream_fetches.store(0, Ordering::Relaxed);
        self.stale_fallbacks.store(0, Ordering::Relaxed);
        self.store_write_failures.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of metrics (for reporting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub freshness_hits: u64,
    pub store_hits: u64,
    pub upstream_resolves: u64,
    pub upstream_fetches: u64,
    pub stale_fallbacks: u64,
    pub store_write_failures: u64,
}

impl MetricsSnapshot {
    /// Requests answered without fetching content upstream.
    pub fn cache_hits(&self) -> u64 {
        self.freshness_hits + self.store_hits + self.stale_fallbacks
    }

    /// Share of content requests served from cache tiers.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits() + self.upstream_fetches;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits() as f64 / total as f64
    }
}
