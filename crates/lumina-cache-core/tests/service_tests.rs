//! Orchestrator behavior tests against a programmable upstream and an
//! in-memory store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use lumina_cache_core::CacheService;
use lumina_store::{MemorySnapshotStore, Snapshot, SnapshotStore, VersionEntry};
use lumina_types::{CacheError, GitProvider, LuminaDoc, RepoKey};
use lumina_upstream::{FetchOutcome, SourceProvider};

const LONG_TTL: Duration = Duration::from_secs(60);

fn test_key() -> RepoKey {
    RepoKey::new(GitProvider::Github, "acme", "docs")
}

fn test_doc(marker: &str) -> LuminaDoc {
    LuminaDoc::from_value(json!({"blocks": [{"id": marker}]})).unwrap()
}

/// Programmable upstream with call counters and an optional artificial delay
/// on content fetches.
struct MockUpstream {
    resolve_calls: AtomicU64,
    fetch_calls: AtomicU64,
    resolve_result: Mutex<Result<String, CacheError>>,
    fetch_result: Mutex<Result<FetchOutcome, CacheError>>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl MockUpstream {
    fn resolving(sha: &str, doc: LuminaDoc) -> Self {
        Self {
            resolve_calls: AtomicU64::new(0),
            fetch_calls: AtomicU64::new(0),
            resolve_result: Mutex::new(Ok(sha.to_string())),
            fetch_result: Mutex::new(Ok((doc, sha.to_string()))),
            fetch_delay: Mutex::new(None),
        }
    }

    fn failing_resolve(err: CacheError) -> Self {
        Self {
            resolve_calls: AtomicU64::new(0),
            fetch_calls: AtomicU64::new(0),
            resolve_result: Mutex::new(Err(err.clone())),
            fetch_result: Mutex::new(Err(err)),
            fetch_delay: Mutex::new(None),
        }
    }

    fn set_fetch_result(&self, result: Result<FetchOutcome, CacheError>) {
        *self.fetch_result.lock() = result;
    }

    fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    fn resolve_calls(&self) -> u64 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for MockUpstream {
    async fn latest_version(&self, _key: &RepoKey) -> Result<String, CacheError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve_result.lock().clone()
    }

    async fn fetch_document(
        &self,
        _key: &RepoKey,
        _version: Option<&str>,
    ) -> Result<FetchOutcome, CacheError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_result.lock().clone()
    }
}

/// Store wrapper whose reads/writes can be made to fail on demand.
struct FlakyStore {
    inner: MemorySnapshotStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemorySnapshotStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn find_exact(
        &self,
        key: &RepoKey,
        version: &str,
    ) -> Result<Option<Snapshot>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::store("read refused"));
        }
        self.inner.find_exact(key, version).await
    }

    async fn find_latest(&self, key: &RepoKey) -> Result<Option<Snapshot>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::store("read refused"));
        }
        self.inner.find_latest(key).await
    }

    async fn list_versions(&self, key: &RepoKey) -> Result<Vec<VersionEntry>, CacheError> {
        self.inner.list_versions(key).await
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::store("write refused"));
        }
        self.inner.save(snapshot).await
    }
}

fn service_with(
    store: Arc<dyn SnapshotStore>,
    upstream: Arc<MockUpstream>,
) -> CacheService {
    CacheService::new(store, upstream, LONG_TTL)
}

#[tokio::test]
async fn test_first_get_fetches_then_second_is_cached() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = service_with(store.clone(), upstream.clone());

    let first = service.get(test_key()).await.unwrap();
    assert_eq!(first.version, "abc1234");
    assert_eq!(first.content, test_doc("v1"));
    assert!(!first.cached);
    assert_eq!(upstream.resolve_calls(), 1);
    assert_eq!(upstream.fetch_calls(), 1);

    // Freshness warm + store populated: zero additional upstream calls
    let second = service.get(test_key()).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.version, "abc1234");
    assert_eq!(second.content, first.content);
    assert_eq!(upstream.resolve_calls(), 1);
    assert_eq!(upstream.fetch_calls(), 1);
}

#[tokio::test]
async fn test_expired_freshness_reresolves_but_reuses_content() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = CacheService::new(store, upstream.clone(), Duration::from_millis(10));

    assert!(!service.get(test_key()).await.unwrap().cached);
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Hint expired: one more resolve, but the content is still in the store
    let again = service.get(test_key()).await.unwrap();
    assert!(again.cached);
    assert_eq!(upstream.resolve_calls(), 2);
    assert_eq!(upstream.fetch_calls(), 1);
}

#[tokio::test]
async fn test_get_by_version_is_idempotent() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("pinned")));
    let service = service_with(store.clone(), upstream.clone());

    let first = service.get_by_version(test_key(), "abc1234").await.unwrap();
    assert!(!first.cached);
    assert_eq!(upstream.fetch_calls(), 1);

    let second = service.get_by_version(test_key(), "abc1234").await.unwrap();
    assert!(second.cached);
    assert_eq!(second.content, first.content);
    // Second call never touches the upstream
    assert_eq!(upstream.fetch_calls(), 1);
    assert_eq!(upstream.resolve_calls(), 0);
}

#[tokio::test]
async fn test_get_by_version_not_found_writes_nothing() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    upstream.set_fetch_result(Err(CacheError::not_found("no lumina.json at deadbeef")));
    let service = service_with(store.clone(), upstream.clone());

    let err = service
        .get_by_version(test_key(), "deadbeef")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_stale_fallback_when_resolve_fails() {
    let store = Arc::new(MemorySnapshotStore::new());
    store
        .save(Snapshot::new(test_key(), "old1111", test_doc("stale")))
        .await
        .unwrap();
    let upstream = Arc::new(MockUpstream::failing_resolve(CacheError::upstream(
        "rate limited (403)",
    )));
    let service = service_with(store, upstream.clone());

    let result = service.get(test_key()).await.unwrap();
    assert!(result.cached);
    assert_eq!(result.version, "old1111");
    assert_eq!(result.content, test_doc("stale"));
    assert_eq!(upstream.fetch_calls(), 0);
}

#[tokio::test]
async fn test_resolve_failure_with_empty_store_propagates() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::failing_resolve(CacheError::upstream(
        "connection refused",
    )));
    let service = service_with(store, upstream);

    let err = service.get(test_key()).await.unwrap_err();
    assert_eq!(err, CacheError::upstream("connection refused"));
}

#[tokio::test]
async fn test_not_found_propagates_despite_stored_snapshot() {
    // Only transient upstream failures recover via stale fallback; a
    // repository that no longer has the document is reported as such.
    let store = Arc::new(MemorySnapshotStore::new());
    store
        .save(Snapshot::new(test_key(), "old1111", test_doc("stale")))
        .await
        .unwrap();
    let upstream = Arc::new(MockUpstream::failing_resolve(CacheError::not_found(
        "no commits for lumina.json",
    )));
    let service = service_with(store, upstream);

    let err = service.get(test_key()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_coalesce_into_one_flight() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("shared")));
    upstream.set_fetch_delay(Duration::from_millis(60));
    let service = service_with(store.clone(), upstream.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.get(test_key()).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // Every caller observed the same outcome from a single operation
    for result in &results {
        assert_eq!(result.version, "abc1234");
        assert_eq!(result.content, results[0].content);
        assert_eq!(result.cached, results[0].cached);
    }
    assert_eq!(upstream.resolve_calls(), 1);
    assert!(upstream.fetch_calls() <= 1);
    // Exactly one snapshot stored for (key, version)
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_store_read_failure_is_treated_as_miss() {
    let store = Arc::new(FlakyStore::new());
    store.fail_reads.store(true, Ordering::SeqCst);
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = service_with(store.clone(), upstream.clone());

    let result = service.get(test_key()).await.unwrap();
    assert!(!result.cached);
    assert_eq!(upstream.fetch_calls(), 1);
}

#[tokio::test]
async fn test_store_write_failure_is_swallowed() {
    let store = Arc::new(FlakyStore::new());
    store.fail_writes.store(true, Ordering::SeqCst);
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = service_with(store.clone(), upstream.clone());

    // Losing the write does not fail the fetch
    let result = service.get(test_key()).await.unwrap();
    assert!(!result.cached);
    assert_eq!(result.version, "abc1234");
    assert_eq!(service.metrics().snapshot().store_write_failures, 1);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_fresh_hint_with_missing_snapshot_falls_through() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = service_with(store, upstream.clone());

    // Warm the freshness tracker without populating the store
    service.freshness().record(&test_key(), "abc1234");

    let result = service.get(test_key()).await.unwrap();
    assert!(!result.cached);
    // The dangling hint triggered a full resolution, not an error
    assert_eq!(upstream.resolve_calls(), 1);
    assert_eq!(upstream.fetch_calls(), 1);
}

#[tokio::test]
async fn test_latest_version_uses_freshness_hint() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    let service = service_with(store, upstream.clone());

    assert_eq!(service.latest_version(&test_key()).await.unwrap(), "abc1234");
    assert_eq!(service.latest_version(&test_key()).await.unwrap(), "abc1234");
    // Second call answered from the freshness tracker
    assert_eq!(upstream.resolve_calls(), 1);
}

#[tokio::test]
async fn test_list_versions_newest_first() {
    let store = Arc::new(MemorySnapshotStore::new());
    let mut old = Snapshot::new(test_key(), "old1111", test_doc("v1"));
    old.created_at = old.created_at - chrono::Duration::seconds(120);
    store.save(old).await.unwrap();
    store
        .save(Snapshot::new(test_key(), "new2222", test_doc("v2")))
        .await
        .unwrap();

    let upstream = Arc::new(MockUpstream::resolving("new2222", test_doc("v2")));
    let service = service_with(store, upstream);

    let versions = service.list_versions(&test_key()).await.unwrap();
    let shas: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(shas, vec!["new2222", "old1111"]);
}

#[tokio::test]
async fn test_invalid_format_propagates() {
    let store = Arc::new(MemorySnapshotStore::new());
    let upstream = Arc::new(MockUpstream::resolving("abc1234", test_doc("v1")));
    upstream.set_fetch_result(Err(CacheError::invalid_format("blocks missing")));
    let service = service_with(store.clone(), upstream);

    let err = service.get(test_key()).await.unwrap_err();
    assert!(matches!(err, CacheError::InvalidFormat(_)));
    assert!(store.is_empty());
}
