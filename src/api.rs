//! Transport-agnostic API surface.
//!
//! The four logical operations exposed to callers, with input validation and
//! serializable payloads. A concrete transport (HTTP, RPC, the CLI in this
//! crate) parses its own wire format into these request types and renders the
//! response types back out.

use serde::Serialize;

use lumina_cache_core::CacheService;
use lumina_store::VersionEntry;
use lumina_types::{CacheError, GitProvider, LuminaDoc, RepoKey};

/// Commit sha length bounds accepted by [`GetByCommitRequest`]: abbreviated
/// (7) through full (40).
const SHA_MIN_LEN: usize = 7;
const SHA_MAX_LEN: usize = 40;

/// Errors surfaced by the API layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request failed validation before reaching the cache core.
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Validated (provider, organization, repository) input.
#[derive(Debug, Clone)]
pub struct RepoRequest {
    pub key: RepoKey,
}

impl RepoRequest {
    pub fn parse(provider: &str, organization: &str, repository: &str) -> Result<Self, ApiError> {
        let provider: GitProvider = provider
            .parse()
            .map_err(|e: lumina_types::ParseProviderError| ApiError::Invalid(e.to_string()))?;
        if organization.trim().is_empty() {
            return Err(ApiError::Invalid("organization must not be empty".into()));
        }
        if repository.trim().is_empty() {
            return Err(ApiError::Invalid("repository must not be empty".into()));
        }
        Ok(Self {
            key: RepoKey::new(provider, organization.trim(), repository.trim()),
        })
    }
}

/// Validated input for the exact-version operation.
#[derive(Debug, Clone)]
pub struct GetByCommitRequest {
    pub key: RepoKey,
    pub commit_sha: String,
}

impl GetByCommitRequest {
    pub fn parse(
        provider: &str,
        organization: &str,
        repository: &str,
        commit_sha: &str,
    ) -> Result<Self, ApiError> {
        let repo = RepoRequest::parse(provider, organization, repository)?;
        let sha = commit_sha.trim();
        if sha.len() < SHA_MIN_LEN || sha.len() > SHA_MAX_LEN {
            return Err(ApiError::Invalid(format!(
                "commit sha must be {}..={} characters, got {}",
                SHA_MIN_LEN,
                SHA_MAX_LEN,
                sha.len()
            )));
        }
        Ok(Self {
            key: repo.key,
            commit_sha: sha.to_string(),
        })
    }
}

/// Success payload for `get` and `get_by_commit`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub content: LuminaDoc,
    pub version: String,
    pub cached: bool,
    pub provider: GitProvider,
    pub organization: String,
    pub repository: String,
}

/// Success payload for `list_versions`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionListResponse {
    pub provider: GitProvider,
    pub organization: String,
    pub repository: String,
    pub versions: Vec<VersionEntry>,
}

/// Success payload for `latest_version`.
#[derive(Debug, Clone, Serialize)]
pub struct LatestVersionResponse {
    pub provider: GitProvider,
    pub organization: String,
    pub repository: String,
    pub version: String,
}

/// Latest document for a repository, cache-first.
pub async fn get(
    service: &CacheService,
    request: RepoRequest,
) -> Result<DocumentResponse, ApiError> {
    let result = service.get(request.key).await?;
    Ok(document_response(result))
}

/// Document pinned to a specific commit sha.
pub async fn get_by_commit(
    service: &CacheService,
    request: GetByCommitRequest,
) -> Result<DocumentResponse, ApiError> {
    let result = service
        .get_by_version(request.key, &request.commit_sha)
        .await?;
    Ok(document_response(result))
}

/// All cached versions for a repository, newest first.
pub async fn list_versions(
    service: &CacheService,
    request: RepoRequest,
) -> Result<VersionListResponse, ApiError> {
    let versions = service.list_versions(&request.key).await?;
    Ok(VersionListResponse {
        provider: request.key.provider,
        organization: request.key.organization,
        repository: request.key.repository,
        versions,
    })
}

/// Just the latest commit sha, without fetching content.
pub async fn latest_version(
    service: &CacheService,
    request: RepoRequest,
) -> Result<LatestVersionResponse, ApiError> {
    let version = service.latest_version(&request.key).await?;
    Ok(LatestVersionResponse {
        provider: request.key.provider,
        organization: request.key.organization,
        repository: request.key.repository,
        version,
    })
}

fn document_response(result: lumina_cache_core::CacheResult) -> DocumentResponse {
    DocumentResponse {
        content: result.content,
        version: result.version,
        cached: result.cached,
        provider: result.key.provider,
        organization: result.key.organization,
        repository: result.key.repository,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_request_validation() {
        assert!(RepoRequest::parse("github", "acme", "docs").is_ok());
        assert!(RepoRequest::parse("svn", "acme", "docs").is_err());
        assert!(RepoRequest::parse("github", "  ", "docs").is_err());
        assert!(RepoRequest::parse("gitlab", "acme", "").is_err());
    }

    #[test]
    fn test_repo_request_trims_inputs() {
        let request = RepoRequest::parse("github", " acme ", " docs ").unwrap();
        assert_eq!(request.key.organization, "acme");
        assert_eq!(request.key.repository, "docs");
    }

    #[test]
    fn test_sha_length_bounds() {
        assert!(GetByCommitRequest::parse("github", "acme", "docs", "abc1234").is_ok());
        let full = "a".repeat(40);
        assert!(GetByCommitRequest::parse("github", "acme", "docs", &full).is_ok());
        assert!(GetByCommitRequest::parse("github", "acme", "docs", "abc").is_err());
        let too_long = "a".repeat(41);
        assert!(GetByCommitRequest::parse("github", "acme", "docs", &too_long).is_err());
    }
}
