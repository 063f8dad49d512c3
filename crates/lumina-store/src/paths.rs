//! Path layout for the filesystem snapshot store.

use std::io::Write;
use std::path::{Path, PathBuf};

use lumina_types::{CacheError, RepoKey};

/// Replace path-hostile characters so org/repo names are safe directory
/// components. Characters outside `[A-Za-z0-9._-]` become `_`.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory holding every snapshot for one repository.
pub fn repo_dir(root: &Path, key: &RepoKey) -> PathBuf {
    root.join(key.provider.as_str())
        .join(sanitize_component(&key.organization))
        .join(sanitize_component(&key.repository))
}

/// Full path of one snapshot file.
pub fn snapshot_path(root: &Path, key: &RepoKey, version: &str) -> PathBuf {
    repo_dir(root, key).join(format!("{}.json", sanitize_component(version)))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dirs(path: &Path) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CacheError::store(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }
    Ok(())
}

/// Write a file atomically (write to a unique temp file, then rename).
///
/// Each call writes its own temp file, so concurrent writers of the same
/// destination never interleave on a shared buffer; the last rename wins
/// and readers only ever see a complete file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    ensure_parent_dirs(path)?;
    let parent = path
        .parent()
        .ok_or_else(|| CacheError::store(format!("{} has no parent directory", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
        CacheError::store(format!(
            "failed to create temp file in {}: {}",
            parent.display(),
            e
        ))
    })?;
    tmp.write_all(contents).map_err(|e| {
        CacheError::store(format!("failed to write {}: {}", tmp.path().display(), e))
    })?;
    tmp.persist(path).map_err(|e| {
        CacheError::store(format!("failed to persist {}: {}", path.display(), e))
    })?;
    Ok(())
}
