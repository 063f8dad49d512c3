//! Error taxonomy shared across the workspace.

/// Errors surfaced by the cache core and its collaborators.
///
/// `Clone` so a single coalesced failure can be delivered to every joined
/// caller; messages carry the context, variants carry the policy (see the
/// propagation rules in the orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The document or version does not exist upstream or in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Retrieved content failed structural validation.
    #[error("invalid lumina.json: {0}")]
    InvalidFormat(String),

    /// Transient upstream failure: network, rate limit, malformed response.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The durable snapshot store is unavailable or misbehaving.
    #[error("store error: {0}")]
    Store(String),
}

impl CacheError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        CacheError::NotFound(msg.into())
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        CacheError::InvalidFormat(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        CacheError::Upstream(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        CacheError::Store(msg.into())
    }

    /// True for transient upstream failures that the orchestrator may recover
    /// from with a stale snapshot.
    pub fn is_upstream(&self) -> bool {
        matches!(self, CacheError::Upstream(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    pub fn is_store(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }
}
