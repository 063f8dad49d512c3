//! Git hosting provider identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A remote source-hosting service documents can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProvider {
    Github,
    Gitlab,
}

impl GitProvider {
    /// All supported providers.
    pub const ALL: [GitProvider; 2] = [GitProvider::Github, GitProvider::Gitlab];

    /// Lowercase wire name ("github" / "gitlab").
    pub fn as_str(&self) -> &'static str {
        match self {
            GitProvider::Github => "github",
            GitProvider::Gitlab => "gitlab",
        }
    }
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown git provider '{0}' (expected 'github' or 'gitlab')")]
pub struct ParseProviderError(pub String);

impl FromStr for GitProvider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(GitProvider::Github),
            "gitlab" => Ok(GitProvider::Gitlab),
            other => Err(ParseProviderError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!("github".parse::<GitProvider>().unwrap(), GitProvider::Github);
        assert_eq!("GitLab".parse::<GitProvider>().unwrap(), GitProvider::Gitlab);
        assert!("bitbucket".parse::<GitProvider>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for provider in GitProvider::ALL {
            let parsed: GitProvider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&GitProvider::Github).unwrap();
        assert_eq!(json, "\"github\"");
        let back: GitProvider = serde_json::from_str("\"gitlab\"").unwrap();
        assert_eq!(back, GitProvider::Gitlab);
    }
}
