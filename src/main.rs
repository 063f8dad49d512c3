//! lumina-cache: caching fetch service for lumina.json documents.
//!
//! Fetches a repository's lumina.json from GitHub or GitLab and serves it
//! through a two-tier cache: a short-TTL freshness hint for "what is the
//! latest commit sha" and a durable snapshot store for the content itself.
//! Concurrent identical requests are coalesced into one upstream call.
//!
//! ## Example usage
//!
//! ```bash
//! # Latest document for a repository (cache-first)
//! lumina-cache get github acme docs
//!
//! # Pin to a specific commit
//! lumina-cache get-commit github acme docs 3f9c2ab
//!
//! # Cached versions, newest first
//! lumina-cache versions github acme docs
//!
//! # Lightweight update check
//! lumina-cache latest-sha github acme docs
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod config;

use config::{build_service, Config};

#[derive(Parser)]
#[command(
    name = "lumina-cache",
    author,
    version,
    about = "Caching fetch service for lumina.json documents",
    long_about = "Fetches lumina.json documents from GitHub/GitLab with freshness\n\
                  tracking, durable snapshots, and request coalescing."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot directory (default: LUMINA_CACHE_DIR or the platform data dir)
    #[arg(long, global = true)]
    cache_dir: Option<std::path::PathBuf>,

    /// Freshness TTL in milliseconds (default: FRESHNESS_TTL_MS or 60000)
    #[arg(long, global = true)]
    ttl_ms: Option<u64>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Get the latest lumina.json for a repository, cache-first
    Get {
        /// Hosting provider: github or gitlab
        provider: String,
        organization: String,
        repository: String,
    },
    /// Get lumina.json pinned to a specific commit sha
    GetCommit {
        provider: String,
        organization: String,
        repository: String,
        /// Commit sha (7 to 40 characters)
        commit_sha: String,
    },
    /// List cached versions for a repository, newest first
    Versions {
        provider: String,
        organization: String,
        repository: String,
    },
    /// Print the latest commit sha without fetching content
    LatestSha {
        provider: String,
        organization: String,
        repository: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(ttl_ms) = cli.ttl_ms {
        config.freshness_ttl = std::time::Duration::from_millis(ttl_ms);
    }

    let service = build_service(&config)?;

    match &cli.command {
        Commands::Get {
            provider,
            organization,
            repository,
        } => {
            let request = api::RepoRequest::parse(provider, organization, repository)?;
            let response = api::get(&service, request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!(
                    "{}:{}/{} @ {} ({}, {} blocks)",
                    response.provider,
                    response.organization,
                    response.repository,
                    response.version,
                    if response.cached { "cached" } else { "fetched" },
                    response.content.block_count()
                );
            }
        }
        Commands::GetCommit {
            provider,
            organization,
            repository,
            commit_sha,
        } => {
            let request =
                api::GetByCommitRequest::parse(provider, organization, repository, commit_sha)?;
            let response = api::get_by_commit(&service, request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!(
                    "{}:{}/{} @ {} ({}, {} blocks)",
                    response.provider,
                    response.organization,
                    response.repository,
                    response.version,
                    if response.cached { "cached" } else { "fetched" },
                    response.content.block_count()
                );
            }
        }
        Commands::Versions {
            provider,
            organization,
            repository,
        } => {
            let request = api::RepoRequest::parse(provider, organization, repository)?;
            let response = api::list_versions(&service, request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if response.versions.is_empty() {
                println!("no cached versions");
            } else {
                for entry in &response.versions {
                    println!("{}  {}", entry.version, entry.created_at.to_rfc3339());
                }
            }
        }
        Commands::LatestSha {
            provider,
            organization,
            repository,
        } => {
            let request = api::RepoRequest::parse(provider, organization, repository)?;
            let response = api::latest_version(&service, request).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.version);
            }
        }
    }

    Ok(())
}
