//! Filesystem-backed snapshot store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use lumina_types::{CacheError, RepoKey};

use crate::paths::{atomic_write, repo_dir, snapshot_path};
use crate::snapshot::{Snapshot, SnapshotStore, VersionEntry};

/// Snapshot store with one JSON file per (repo, commit sha).
///
/// Layout: `<root>/<provider>/<org>/<repo>/<sha>.json`. Writes go through a
/// temp file and rename, so a crashed write never leaves a half-written
/// snapshot visible to readers.
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            CacheError::store(format!(
                "failed to create store root {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_snapshot(&self, path: &Path) -> Result<Snapshot, CacheError> {
        let raw = std::fs::read(path)
            .map_err(|e| CacheError::store(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_slice(&raw).map_err(|e| {
            CacheError::store(format!("corrupt snapshot file {}: {}", path.display(), e))
        })
    }

    /// Load every snapshot stored for `key`. An absent repo directory is an
    /// empty result, not an error.
    fn load_all(&self, key: &RepoKey) -> Result<Vec<Snapshot>, CacheError> {
        let dir = repo_dir(&self.root, key);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::store(format!(
                    "failed to list {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CacheError::store(format!("failed to list {}: {}", dir.display(), e))
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            snapshots.push(self.load_snapshot(&path)?);
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn find_exact(
        &self,
        key: &RepoKey,
        version: &str,
    ) -> Result<Option<Snapshot>, CacheError> {
        let path = snapshot_path(&self.root, key, version);
        if !path.exists() {
            return Ok(None);
        }
        self.load_snapshot(&path).map(Some)
    }

    async fn find_latest(&self, key: &RepoKey) -> Result<Option<Snapshot>, CacheError> {
        let snapshots = self.load_all(key)?;
        Ok(snapshots.into_iter().max_by_key(|snap| snap.created_at))
    }

    async fn list_versions(&self, key: &RepoKey) -> Result<Vec<VersionEntry>, CacheError> {
        let mut versions: Vec<VersionEntry> = self
            .load_all(key)?
            .into_iter()
            .map(|snap| VersionEntry {
                version: snap.version,
                created_at: snap.created_at,
            })
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(versions)
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), CacheError> {
        let path = snapshot_path(&self.root, &snapshot.key, &snapshot.version);
        // First write wins; a re-save of the same version is a no-op.
        if path.exists() {
            debug!(key = %snapshot.key, version = %snapshot.version, "snapshot already stored");
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| CacheError::store(format!("failed to encode snapshot: {}", e)))?;
        atomic_write(&path, &json)
    }
}
