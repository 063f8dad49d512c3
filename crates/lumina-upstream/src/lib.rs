//! Upstream provider clients for lumina-cache.
//!
//! The cache core consumes the [`SourceProvider`] capability; this crate
//! implements it for GitHub and GitLab with blocking `ureq` clients wrapped in
//! `spawn_blocking` at the async seam. One logical fetch makes a single
//! attempt - retry policy, if any, belongs to callers outside the core.
//!
//! ## Usage
//!
//! ```ignore
//! let upstream = UpstreamClient::new();
//! let sha = upstream.latest_version(&key).await?;
//! let (doc, resolved) = upstream.fetch_document(&key, Some(&sha)).await?;
//! ```

pub mod github;
pub mod gitlab;

use async_trait::async_trait;
use tracing::debug;

use lumina_types::{short_sha, CacheError, GitProvider, LuminaDoc, RepoKey};

pub use github::GithubClient;
pub use gitlab::GitlabClient;

/// Document path fetched from every repository.
pub const LUMINA_FILE: &str = "lumina.json";

/// A fetched document together with the commit sha it was resolved at.
pub type FetchOutcome = (LuminaDoc, String);

/// Abstract upstream resolver/fetcher consumed by the cache orchestrator.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Resolve the most recent commit sha touching lumina.json.
    ///
    /// Fails with [`CacheError::NotFound`] if the file has no history, or
    /// [`CacheError::Upstream`] on network/rate-limit/malformed-response
    /// failures.
    async fn latest_version(&self, key: &RepoKey) -> Result<String, CacheError>;

    /// Fetch the document at `version`; `None` means "resolve and fetch the
    /// current default branch state".
    async fn fetch_document(
        &self,
        key: &RepoKey,
        version: Option<&str>,
    ) -> Result<FetchOutcome, CacheError>;
}

/// Dispatches to the concrete provider client selected by the repo key.
#[derive(Clone, Default)]
pub struct UpstreamClient {
    github: GithubClient,
    gitlab: GitlabClient,
}

impl UpstreamClient {
    /// Client against the public github.com / gitlab.com APIs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override either API endpoint (self-hosted instances, tests).
    pub fn with_endpoints(github_url: Option<&str>, gitlab_url: Option<&str>) -> Self {
        Self {
            github: github_url
                .map(GithubClient::with_endpoint)
                .unwrap_or_default(),
            gitlab: gitlab_url
                .map(GitlabClient::with_endpoint)
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SourceProvider for UpstreamClient {
    async fn latest_version(&self, key: &RepoKey) -> Result<String, CacheError> {
        debug!(%key, "resolving latest commit sha upstream");
        let key = key.clone();
        let client = self.clone();
        spawn_upstream(move || match key.provider {
            GitProvider::Github => client
                .github
                .latest_commit_sha(&key.organization, &key.repository),
            GitProvider::Gitlab => client
                .gitlab
                .latest_commit_sha(&key.organization, &key.repository),
        })
        .await
    }

    async fn fetch_document(
        &self,
        key: &RepoKey,
        version: Option<&str>,
    ) -> Result<FetchOutcome, CacheError> {
        debug!(
            %key,
            sha = version.map(short_sha).unwrap_or("HEAD"),
            "fetching lumina.json upstream"
        );
        let key = key.clone();
        let version = version.map(str::to_string);
        let client = self.clone();
        spawn_upstream(move || match key.provider {
            GitProvider::Github => client.github.fetch_document(
                &key.organization,
                &key.repository,
                version.as_deref(),
            ),
            GitProvider::Gitlab => client.gitlab.fetch_document(
                &key.organization,
                &key.repository,
                version.as_deref(),
            ),
        })
        .await
    }
}

/// Run a blocking provider call on the tokio blocking pool.
async fn spawn_upstream<T, F>(op: F) -> Result<T, CacheError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CacheError::upstream(format!("provider task failed: {}", e)))?
}

/// Shared HTTP status mapping for both providers.
pub(crate) fn status_error(context: &str, code: u16) -> CacheError {
    match code {
        404 => CacheError::not_found(context.to_string()),
        403 | 429 => CacheError::upstream(format!("rate limited ({}): {}", code, context)),
        _ => CacheError::upstream(format!("HTTP {}: {}", code, context)),
    }
}

/// Decode provider-supplied base64 content (tolerates embedded newlines).
pub(crate) fn decode_content(raw: &str) -> Result<Vec<u8>, CacheError> {
    use base64::Engine;
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CacheError::invalid_format(format!("content is not valid base64: {}", e)))
}
