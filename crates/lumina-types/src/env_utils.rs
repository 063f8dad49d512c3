//! Environment variable parsing helpers.
//!
//! Small type-safe wrappers so configuration loading does not repeat the
//! `var().ok().and_then(parse).unwrap_or(..)` dance.

use std::str::FromStr;

/// Parse an environment variable into any `FromStr` type.
///
/// Returns `None` if the variable is unset or fails to parse.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable, falling back to a default.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Read a string environment variable, `None` if unset or blank.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or() {
        std::env::set_var("LUMINA_TEST_TTL", "250");
        let ttl: u64 = env_var_or("LUMINA_TEST_TTL", 60_000);
        assert_eq!(ttl, 250);
        std::env::remove_var("LUMINA_TEST_TTL");

        let fallback: u64 = env_var_or("LUMINA_TEST_UNSET_1", 60_000);
        assert_eq!(fallback, 60_000);
    }

    #[test]
    fn test_env_string_blank_is_none() {
        std::env::set_var("LUMINA_TEST_BLANK", "   ");
        assert_eq!(env_string("LUMINA_TEST_BLANK"), None);
        std::env::remove_var("LUMINA_TEST_BLANK");
        assert_eq!(env_string("LUMINA_TEST_UNSET_2"), None);
    }
}
