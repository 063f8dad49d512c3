//! The cache orchestrator.
//!
//! Combines the freshness tracker, the snapshot store, and the upstream
//! provider behind the four public operations. Every content operation is
//! routed through the request coalescer first, so bursty duplicate demand for
//! one repository costs at most one upstream round-trip.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use lumina_store::{Snapshot, SnapshotStore, VersionEntry};
use lumina_types::{short_sha, CacheError, LuminaDoc, RepoKey};
use lumina_upstream::SourceProvider;

use crate::coalesce::{FlightKey, RequestCoalescer};
use crate::freshness::FreshnessTracker;
use crate::metrics::CacheMetrics;

/// Outcome of a content request.
///
/// `cached` is `true` whenever the content came from the durable store, stale
/// fallbacks included - callers can always tell a fresh fetch from a reused
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheResult {
    pub content: LuminaDoc,
    pub version: String,
    pub cached: bool,
    #[serde(flatten)]
    pub key: RepoKey,
}

impl CacheResult {
    fn cached(snapshot: Snapshot) -> Self {
        Self {
            content: snapshot.content,
            version: snapshot.version,
            cached: true,
            key: snapshot.key,
        }
    }

    fn fresh(snapshot: Snapshot) -> Self {
        Self {
            content: snapshot.content,
            version: snapshot.version,
            cached: false,
            key: snapshot.key,
        }
    }
}

struct Inner {
    store: Arc<dyn SnapshotStore>,
    upstream: Arc<dyn SourceProvider>,
    freshness: FreshnessTracker,
    flights: RequestCoalescer<CacheResult>,
    metrics: CacheMetrics,
}

/// The caching/coalescing orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl CacheService {
    /// Wire the orchestrator from its collaborators. `freshness_ttl` bounds
    /// how long a resolved "latest sha" is trusted without re-asking upstream.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        upstream: Arc<dyn SourceProvider>,
        freshness_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                upstream,
                freshness: FreshnessTracker::new(freshness_ttl),
                flights: RequestCoalescer::new(),
                metrics: CacheMetrics::new(),
            }),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.inner.metrics
    }

    pub fn freshness(&self) -> &FreshnessTracker {
        &self.inner.freshness
    }

    /// Number of coalesced flights currently in progress.
    pub fn inflight_count(&self) -> usize {
        self.inner.flights.inflight_count()
    }

    /// Get the document at the most recent version of `key`, consulting the
    /// freshness hint and the store before touching the upstream. Falls back
    /// to the newest stored snapshot if the upstream cannot resolve a latest
    /// version.
    pub async fn get(&self, key: RepoKey) -> Result<CacheResult, CacheError> {
        let inner = Arc::clone(&self.inner);
        let op_key = key.clone();
        self.inner
            .flights
            .run(FlightKey::latest(key), async move {
                Inner::get_latest(inner, op_key).await
            })
            .await
    }

    /// Get the document at one exact commit sha. Cache-first and never
    /// consults the freshness tracker: an exact version never goes stale.
    /// No fallback on failure - there is nothing older to degrade to.
    pub async fn get_by_version(
        &self,
        key: RepoKey,
        version: &str,
    ) -> Result<CacheResult, CacheError> {
        let inner = Arc::clone(&self.inner);
        let op_key = key.clone();
        let op_version = version.to_string();
        self.inner
            .flights
            .run(FlightKey::exact(key, version), async move {
                Inner::get_exact(inner, op_key, op_version).await
            })
            .await
    }

    /// Just the latest commit sha, for lightweight update checking.
    pub async fn latest_version(&self, key: &RepoKey) -> Result<String, CacheError> {
        if let Some(sha) = self.inner.freshness.lookup(key) {
            return Ok(sha);
        }
        self.inner.metrics.record_upstream_resolve();
        let sha = self.inner.upstream.latest_version(key).await?;
        self.inner.freshness.record(key, &sha);
        Ok(sha)
    }

    /// All stored versions for `key`, newest first.
    pub async fn list_versions(&self, key: &RepoKey) -> Result<Vec<VersionEntry>, CacheError> {
        self.inner.store.list_versions(key).await
    }
}

impl Inner {
    async fn get_latest(inner: Arc<Inner>, key: RepoKey) -> Result<CacheResult, CacheError> {
        debug!(%key, "getting latest lumina.json");

        // Recently confirmed sha + stored content: zero upstream calls.
        if let Some(sha) = inner.freshness.lookup(&key) {
            if let Some(snapshot) = inner.find_exact_or_miss(&key, &sha).await {
                debug!(%key, sha = short_sha(&sha), "cache hit (fresh)");
                inner.metrics.record_freshness_hit();
                return Ok(CacheResult::cached(snapshot));
            }
            // A fresh hint whose snapshot is missing falls through to a full
            // resolution; the prior write likely failed and was swallowed.
        }

        inner.metrics.record_upstream_resolve();
        let latest = match inner.upstream.latest_version(&key).await {
            Ok(sha) => sha,
            Err(err) if err.is_upstream() => {
                warn!(%key, %err, "latest-sha resolution failed, trying stale fallback");
                inner.freshness.invalidate(&key);
                if let Some(snapshot) = inner.find_latest_or_miss(&key).await {
                    debug!(%key, sha = short_sha(&snapshot.version), "serving stale snapshot");
                    inner.metrics.record_stale_fallback();
                    return Ok(CacheResult::cached(snapshot));
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        inner.freshness.record(&key, &latest);

        if let Some(snapshot) = inner.find_exact_or_miss(&key, &latest).await {
            debug!(%key, sha = short_sha(&latest), "cache hit");
            inner.metrics.record_store_hit();
            return Ok(CacheResult::cached(snapshot));
        }

        debug!(%key, sha = short_sha(&latest), "cache miss, fetching upstream");
        inner.metrics.record_upstream_fetch();
        let (content, resolved) = inner.upstream.fetch_document(&key, Some(&latest)).await?;
        let snapshot = Snapshot::new(key, resolved, content);
        inner.persist(snapshot.clone()).await;
        Ok(CacheResult::fresh(snapshot))
    }

    async fn get_exact(
        inner: Arc<Inner>,
        key: RepoKey,
        version: String,
    ) -> Result<CacheResult, CacheError> {
        debug!(%key, sha = short_sha(&version), "getting lumina.json at exact sha");

        if let Some(snapshot) = inner.find_exact_or_miss(&key, &version).await {
            inner.metrics.record_store_hit();
            return Ok(CacheResult::cached(snapshot));
        }

        debug!(%key, sha = short_sha(&version), "cache miss, fetching upstream");
        inner.metrics.record_upstream_fetch();
        let (content, resolved) = inner.upstream.fetch_document(&key, Some(&version)).await?;
        let snapshot = Snapshot::new(key, resolved, content);
        inner.persist(snapshot.clone()).await;
        Ok(CacheResult::fresh(snapshot))
    }

    /// Store read with the availability policy applied: a failing read is a
    /// cache miss, not a request failure.
    async fn find_exact_or_miss(&self, key: &RepoKey, version: &str) -> Option<Snapshot> {
        match self.store.find_exact(key, version).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%key, %err, "store read failed, treating as miss");
                None
            }
        }
    }

    async fn find_latest_or_miss(&self, key: &RepoKey) -> Option<Snapshot> {
        match self.store.find_latest(key).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%key, %err, "store read failed, treating as miss");
                None
            }
        }
    }

    /// Store write with the availability policy applied: losing a write must
    /// not fail an otherwise-successful fetch.
    async fn persist(&self, snapshot: Snapshot) {
        let key = snapshot.key.clone();
        let version = snapshot.version.clone();
        if let Err(err) = self.store.save(snapshot).await {
            warn!(%key, sha = short_sha(&version), %err, "failed to save snapshot");
            self.metrics.record_store_write_failure();
        } else {
            debug!(%key, sha = short_sha(&version), "snapshot saved");
        }
    }
}
