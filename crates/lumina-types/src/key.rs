//! Repository identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::GitProvider;

/// Identifies a logical document source: one repository on one provider.
///
/// Immutable once constructed and compared by value; used as the map key for
/// freshness tracking, request coalescing, and snapshot storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoKey {
    pub provider: GitProvider,
    pub organization: String,
    pub repository: String,
}

impl RepoKey {
    pub fn new(
        provider: GitProvider,
        organization: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            organization: organization.into(),
            repository: repository.into(),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.provider, self.organization, self.repository
        )
    }
}

/// Abbreviate a commit sha for log output.
///
/// Version strings are opaque, so truncation counts characters rather than
/// bytes; a non-ASCII string must not split mid-codepoint.
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}
