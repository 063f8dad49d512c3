//! Environment-driven configuration and service wiring.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use lumina_cache_core::CacheService;
use lumina_store::{FsSnapshotStore, MemorySnapshotStore, SnapshotStore};
use lumina_types::env_utils::{env_string, env_var_or};
use lumina_upstream::UpstreamClient;

/// Default freshness TTL: one minute.
const DEFAULT_FRESHNESS_TTL_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long a resolved "latest sha" is trusted without re-asking upstream.
    pub freshness_ttl: Duration,
    /// Snapshot directory; `None` keeps snapshots in memory only.
    pub cache_dir: Option<PathBuf>,
    /// Override for the GitHub API endpoint (self-hosted instances).
    pub github_api_url: Option<String>,
    /// Override for the GitLab API endpoint.
    pub gitlab_api_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment:
    /// `FRESHNESS_TTL_MS`, `LUMINA_CACHE_DIR`, `GITHUB_API_URL`,
    /// `GITLAB_API_URL`. Unset `LUMINA_CACHE_DIR` falls back to the platform
    /// data directory.
    pub fn from_env() -> Self {
        let cache_dir = env_string("LUMINA_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|dir| dir.join("lumina-cache")));

        Self {
            freshness_ttl: Duration::from_millis(env_var_or(
                "FRESHNESS_TTL_MS",
                DEFAULT_FRESHNESS_TTL_MS,
            )),
            cache_dir,
            github_api_url: env_string("GITHUB_API_URL"),
            gitlab_api_url: env_string("GITLAB_API_URL"),
        }
    }
}

/// Wire a [`CacheService`] from configuration.
pub fn build_service(config: &Config) -> Result<CacheService> {
    let store: Arc<dyn SnapshotStore> = match &config.cache_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using filesystem snapshot store");
            Arc::new(
                FsSnapshotStore::new(dir)
                    .with_context(|| format!("cannot open snapshot store at {}", dir.display()))?,
            )
        }
        None => {
            info!("using in-memory snapshot store");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    let upstream = Arc::new(UpstreamClient::with_endpoints(
        config.github_api_url.as_deref(),
        config.gitlab_api_url.as_deref(),
    ));

    Ok(CacheService::new(store, upstream, config.freshness_ttl))
}
