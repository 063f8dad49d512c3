//! Caching/coalescing orchestrator for lumina.json documents.
//!
//! This crate is the decision core of the service: for every request it
//! decides whether to trust a recent freshness check, reuse a durable
//! snapshot, or issue a new upstream fetch, and how to degrade when the
//! upstream is unreachable or rate-limited.
//!
//! Components:
//! - [`FreshnessTracker`]: short-TTL memory of the last observed commit sha
//!   per repository, so "what is the latest sha" is not re-asked on every hit
//! - [`RequestCoalescer`]: single-flight table so concurrent identical
//!   requests share one upstream operation and one outcome
//! - [`CacheService`]: combines both with a [`SnapshotStore`] and a
//!   [`SourceProvider`] into the `get` / `get_by_version` / `latest_version` /
//!   `list_versions` operations
//! - [`CacheMetrics`]: thread-safe counters over the decision paths
//!
//! [`SnapshotStore`]: lumina_store::SnapshotStore
//! [`SourceProvider`]: lumina_upstream::SourceProvider

pub mod coalesce;
pub mod freshness;
pub mod metrics;
pub mod service;

pub use coalesce::{FlightKey, RequestCoalescer};
pub use freshness::FreshnessTracker;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use service::{CacheResult, CacheService};
