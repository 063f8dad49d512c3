//! Short-TTL tracking of the last observed commit sha per repository.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use lumina_types::{short_sha, RepoKey};

#[derive(Debug, Clone)]
struct FreshnessEntry {
    version: String,
    checked_at: Instant,
}

/// In-memory record of "the last commit sha we observed for this repository,
/// and when". Exists purely to avoid asking the upstream for the latest sha
/// too often.
///
/// Expiry is lazy: a stale entry is evicted when its key is next queried;
/// there is no background sweep, so unread stale entries linger until queried,
/// [`clear`](Self::clear), or process restart. Entries are never persisted -
/// losing them on restart costs one extra upstream resolve per repository.
#[derive(Debug)]
pub struct FreshnessTracker {
    ttl: Duration,
    entries: Mutex<HashMap<RepoKey, FreshnessEntry>>,
}

impl FreshnessTracker {
    /// Tracker with a fixed TTL shared by all keys.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the entry for `key` with (`version`, now).
    pub fn record(&self, key: &RepoKey, version: &str) {
        debug!(%key, sha = short_sha(version), "freshness recorded");
        self.entries.lock().insert(
            key.clone(),
            FreshnessEntry {
                version: version.to_string(),
                checked_at: Instant::now(),
            },
        );
    }

    /// The recorded sha if it is still within the TTL; evicts a stale entry
    /// as a side effect.
    pub fn lookup(&self, key: &RepoKey) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.checked_at.elapsed() > self.ttl {
            entries.remove(key);
            debug!(%key, "freshness entry expired");
            return None;
        }
        Some(entry.version.clone())
    }

    /// Unconditionally drop the entry for `key`. Called when upstream state
    /// may have changed independently, e.g. after a rate-limit error.
    pub fn invalidate(&self, key: &RepoKey) {
        if self.entries.lock().remove(key).is_some() {
            debug!(%key, "freshness entry invalidated");
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries currently held, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_types::GitProvider;

    fn test_key() -> RepoKey {
        RepoKey::new(GitProvider::Github, "acme", "docs")
    }

    #[test]
    fn test_lookup_within_ttl() {
        let tracker = FreshnessTracker::new(Duration::from_secs(60));
        tracker.record(&test_key(), "abc1234");
        assert_eq!(tracker.lookup(&test_key()), Some("abc1234".to_string()));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let tracker = FreshnessTracker::new(Duration::from_millis(10));
        tracker.record(&test_key(), "abc1234");
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(tracker.lookup(&test_key()), None);
        // Lazy eviction happened as a side effect of the read
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_record_overwrites() {
        let tracker = FreshnessTracker::new(Duration::from_secs(60));
        tracker.record(&test_key(), "abc1234");
        tracker.record(&test_key(), "def5678");
        assert_eq!(tracker.lookup(&test_key()), Some("def5678".to_string()));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_invalidate_single_key() {
        let tracker = FreshnessTracker::new(Duration::from_secs(60));
        let other = RepoKey::new(GitProvider::Gitlab, "acme", "docs");
        tracker.record(&test_key(), "abc1234");
        tracker.record(&other, "def5678");

        tracker.invalidate(&test_key());
        assert_eq!(tracker.lookup(&test_key()), None);
        assert_eq!(tracker.lookup(&other), Some("def5678".to_string()));
    }

    #[test]
    fn test_clear() {
        let tracker = FreshnessTracker::new(Duration::from_secs(60));
        tracker.record(&test_key(), "abc1234");
        tracker.clear();
        assert!(tracker.is_empty());
    }
}
