//! Snapshot data model and the store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lumina_types::{CacheError, LuminaDoc, RepoKey};

/// An immutable content snapshot: one lumina.json document at one commit sha.
///
/// Created only by a successful upstream fetch; read many times, never
/// updated, never deleted by the cache core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: RepoKey,
    pub version: String,
    pub content: LuminaDoc,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(key: RepoKey, version: impl Into<String>, content: LuminaDoc) -> Self {
        Self {
            key,
            version: version.into(),
            content,
            created_at: Utc::now(),
        }
    }
}

/// One entry in a version listing, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// Storage capability the cache orchestrator depends on.
///
/// Implementations must tolerate concurrent `save` calls for the same
/// (key, version): the orchestrator may save redundantly under races, and a
/// duplicate insert must neither fail nor disturb `find_latest`/`list_versions`
/// ordering.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Exact-match point lookup on (key, version).
    async fn find_exact(
        &self,
        key: &RepoKey,
        version: &str,
    ) -> Result<Option<Snapshot>, CacheError>;

    /// The snapshot with the greatest `created_at` for `key`, if any.
    async fn find_latest(&self, key: &RepoKey) -> Result<Option<Snapshot>, CacheError>;

    /// All stored versions for `key`, newest first.
    async fn list_versions(&self, key: &RepoKey) -> Result<Vec<VersionEntry>, CacheError>;

    /// Idempotent insert; a duplicate (key, version) is a no-op.
    async fn save(&self, snapshot: Snapshot) -> Result<(), CacheError>;
}
