//! GitHub REST API client.
//!
//! Unauthenticated access to the public API (subject to GitHub's anonymous
//! rate limit). Endpoints used:
//! - `GET /repos/{org}/{repo}/commits?path=lumina.json&per_page=1`
//! - `GET /repos/{org}/{repo}` (default branch discovery)
//! - `GET /repos/{org}/{repo}/contents/lumina.json?ref=..`

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use lumina_types::{short_sha, CacheError, LuminaDoc};

use crate::{decode_content, status_error, FetchOutcome, LUMINA_FILE};

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("lumina-cache/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking GitHub client over `ureq`.
#[derive(Clone)]
pub struct GithubClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::with_endpoint(GITHUB_API)
    }
}

impl GithubClient {
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    /// Latest commit sha touching lumina.json.
    pub fn latest_commit_sha(&self, org: &str, repo: &str) -> Result<String, CacheError> {
        let url = format!(
            "{}/repos/{}/{}/commits?path={}&per_page=1",
            self.endpoint, org, repo, LUMINA_FILE
        );
        let commits = self.get_json(&url, &format!("{}/{}", org, repo))?;

        commits
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|commit| commit.get("sha"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CacheError::not_found(format!(
                    "no commits found for {} in {}/{}",
                    LUMINA_FILE, org, repo
                ))
            })
    }

    /// Fetch lumina.json content; `sha` absent means "default branch".
    pub fn fetch_document(
        &self,
        org: &str,
        repo: &str,
        sha: Option<&str>,
    ) -> Result<FetchOutcome, CacheError> {
        let reference = match sha {
            Some(sha) => sha.to_string(),
            None => self.default_branch(org, repo)?,
        };
        debug!(org, repo, reference = short_sha(&reference), "fetching contents from GitHub");

        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.endpoint, org, repo, LUMINA_FILE, reference
        );
        let data = self.get_json(&url, &format!("{}/{}@{}", org, repo, reference))?;

        // Directories and symlinks come back with a different `type`
        if data.get("type").and_then(Value::as_str) != Some("file") {
            return Err(CacheError::not_found(format!(
                "{} is not a file in {}/{}",
                LUMINA_FILE, org, repo
            )));
        }
        let content = data
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CacheError::upstream(format!(
                    "contents response for {}/{} has no content field",
                    org, repo
                ))
            })?;

        let raw = decode_content(content)?;
        let doc = LuminaDoc::from_slice(&raw)?;

        // An explicit sha is already resolved; for a branch fetch, pin the
        // result to the sha the content was fetched at.
        let resolved = match sha {
            Some(sha) => sha.to_string(),
            None => self.latest_commit_sha(org, repo)?,
        };

        Ok((doc, resolved))
    }

    fn default_branch(&self, org: &str, repo: &str) -> Result<String, CacheError> {
        let url = format!("{}/repos/{}/{}", self.endpoint, org, repo);
        let data = self.get_json(&url, &format!("{}/{}", org, repo))?;
        data.get("default_branch")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CacheError::upstream(format!(
                    "repository response for {}/{} has no default branch",
                    org, repo
                ))
            })
    }

    fn get_json(&self, url: &str, context: &str) -> Result<Value, CacheError> {
        let response = self
            .agent
            .get(url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", USER_AGENT)
            .call();

        match response {
            Ok(resp) => resp
                .into_json()
                .map_err(|e| CacheError::upstream(format!("malformed response for {}: {}", context, e))),
            Err(ureq::Error::Status(code, _)) => Err(status_error(context, code)),
            Err(e) => Err(CacheError::upstream(format!("request to {} failed: {}", url, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = GithubClient::with_endpoint("https://github.example/api/");
        assert_eq!(client.endpoint, "https://github.example/api");
    }

    // Network tests require access to api.github.com and the anonymous rate
    // limit budget; run with: cargo test -p lumina-upstream -- --ignored
    #[test]
    #[ignore = "requires network access to api.github.com"]
    fn test_latest_commit_sha_live() {
        let client = GithubClient::default();
        let err = client.latest_commit_sha("octocat", "Hello-World");
        // Hello-World has no lumina.json; the point is a clean NotFound.
        assert!(err.unwrap_err().is_not_found());
    }
}
