//! In-memory snapshot store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use lumina_types::{CacheError, RepoKey};

use crate::snapshot::{Snapshot, SnapshotStore, VersionEntry};

/// Snapshot store keyed by (repo key, commit sha), held in memory.
///
/// Thread-safe via an internal RwLock. Used in tests and for deployments that
/// accept losing the durable tier on restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<(RepoKey, String), Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots across all repositories.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn find_exact(
        &self,
        key: &RepoKey,
        version: &str,
    ) -> Result<Option<Snapshot>, CacheError> {
        Ok(self
            .entries
            .read()
            .get(&(key.clone(), version.to_string()))
            .cloned())
    }

    async fn find_latest(&self, key: &RepoKey) -> Result<Option<Snapshot>, CacheError> {
        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|snap| &snap.key == key)
            .max_by_key(|snap| snap.created_at)
            .cloned())
    }

    async fn list_versions(&self, key: &RepoKey) -> Result<Vec<VersionEntry>, CacheError> {
        let entries = self.entries.read();
        let mut versions: Vec<VersionEntry> = entries
            .values()
            .filter(|snap| &snap.key == key)
            .map(|snap| VersionEntry {
                version: snap.version.clone(),
                created_at: snap.created_at,
            })
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(versions)
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        // First write wins; duplicates keep the original created_at.
        entries
            .entry((snapshot.key.clone(), snapshot.version.clone()))
            .or_insert(snapshot);
        Ok(())
    }
}
