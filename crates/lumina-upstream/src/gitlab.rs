//! GitLab REST API (v4) client.
//!
//! Unauthenticated access to the public API. Endpoints used:
//! - `GET /projects/{id}/repository/commits?path=lumina.json&per_page=1`
//! - `GET /projects/{id}/repository/files/lumina.json?ref=..`
//!
//! Project ids are the URL-encoded `org/repo` path, as GitLab requires.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use lumina_types::{short_sha, CacheError, LuminaDoc};

use crate::{decode_content, status_error, FetchOutcome, LUMINA_FILE};

const GITLAB_API: &str = "https://gitlab.com/api/v4";
const USER_AGENT: &str = concat!("lumina-cache/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking GitLab client over `ureq`.
#[derive(Clone)]
pub struct GitlabClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl Default for GitlabClient {
    fn default() -> Self {
        Self::with_endpoint(GITLAB_API)
    }
}

impl GitlabClient {
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    /// Latest commit sha touching lumina.json.
    pub fn latest_commit_sha(&self, org: &str, repo: &str) -> Result<String, CacheError> {
        let project = project_id(org, repo);
        let url = format!(
            "{}/projects/{}/repository/commits?path={}&per_page=1",
            self.endpoint, project, LUMINA_FILE
        );
        let commits = self.get_json(&url, &format!("{}/{}", org, repo))?;

        commits
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|commit| commit.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CacheError::not_found(format!(
                    "no commits found for {} in {}/{}",
                    LUMINA_FILE, org, repo
                ))
            })
    }

    /// Fetch lumina.json content; `sha` absent means `HEAD`.
    pub fn fetch_document(
        &self,
        org: &str,
        repo: &str,
        sha: Option<&str>,
    ) -> Result<FetchOutcome, CacheError> {
        let reference = sha.unwrap_or("HEAD");
        debug!(org, repo, reference = short_sha(reference), "fetching file from GitLab");

        let project = project_id(org, repo);
        let url = format!(
            "{}/projects/{}/repository/files/{}?ref={}",
            self.endpoint, project, LUMINA_FILE, reference
        );
        let file = self.get_json(&url, &format!("{}/{}@{}", org, repo, reference))?;

        let content = file
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CacheError::upstream(format!(
                    "file response for {}/{} has no content field",
                    org, repo
                ))
            })?;

        let raw = decode_content(content)?;
        let doc = LuminaDoc::from_slice(&raw)?;

        let resolved = match sha {
            Some(sha) => sha.to_string(),
            None => self.latest_commit_sha(org, repo)?,
        };

        Ok((doc, resolved))
    }

    fn get_json(&self, url: &str, context: &str) -> Result<Value, CacheError> {
        let response = self
            .agent
            .get(url)
            .set("Accept", "application/json")
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

/// URL-encode `org/repo` into a GitLab project id path component.
fn project_id(org: &str, repo: &str) -> String {
    format!("{}%2F{}", encode_component(org), encode_component(repo))
}

/// Percent-encode a path component (RFC 3986 unreserved set kept verbatim).
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_encoding() {
        assert_eq!(project_id("acme", "docs"), "acme%2Fdocs");
        // Nested group paths stay a single project id
        assert_eq!(project_id("group/sub", "docs"), "group%2Fsub%2Fdocs");
    }

    #[test]
    fn test_encode_component_specials() {
        assert_eq!(encode_component("a b+c"), "a%20b%2Bc");
        assert_eq!(encode_component("safe-._~"), "safe-._~");
    }

    #[test]
    #[ignore = "requires network access to gitlab.com"]
    fn test_latest_commit_sha_live() {
        let client = GitlabClient::default();
        let err = client.latest_commit_sha("gitlab-org", "gitlab-runner");
        assert!(err.unwrap_err().is_not_found());
    }
}
