//! Backend configuration
//!
//! Two values come from the environment: the hosted backend URL and its
//! public (anon) key. Both fall back to placeholders so the crate still runs
//! without them.

use tracing::warn;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

pub const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_ANON_KEY: &str = "placeholder-key";

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            anon_key: PLACEHOLDER_ANON_KEY.to_string(),
        }
    }
}

impl BackendConfig {
    /// Load settings from the environment (and `.env` if present)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self::from_values(
            std::env::var(URL_VAR).ok(),
            std::env::var(ANON_KEY_VAR).ok(),
        )
    }

    /// Build settings from optional raw values, warning when one is missing
    pub fn from_values(url: Option<String>, anon_key: Option<String>) -> Self {
        let url = url.filter(|v| !v.trim().is_empty());
        let anon_key = anon_key.filter(|v| !v.trim().is_empty());

        if url.is_none() || anon_key.is_none() {
            warn!(
                "Missing backend environment variables. Set {} and {}.",
                URL_VAR, ANON_KEY_VAR
            );
        }

        Self {
            url: url
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| PLACEHOLDER_URL.to_string()),
            anon_key: anon_key
                .map(|k| k.trim().to_string())
                .unwrap_or_else(|| PLACEHOLDER_ANON_KEY.to_string()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.url == PLACEHOLDER_URL || self.anon_key == PLACEHOLDER_ANON_KEY
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_fall_back_to_placeholders() {
        let config = BackendConfig::from_values(None, Some(String::new()));
        assert_eq!(config, BackendConfig::default());
        assert!(config.is_placeholder());
    }

    #[test]
    fn test_url_is_trimmed() {
        let config = BackendConfig::from_values(
            Some("https://abc.supabase.co/".to_string()),
            Some("anon".to_string()),
        );
        assert_eq!(config.url, "https://abc.supabase.co");
        assert!(!config.is_placeholder());
        assert_eq!(
            config.rest_url("properties"),
            "https://abc.supabase.co/rest/v1/properties"
        );
        assert_eq!(config.auth_url("user"), "https://abc.supabase.co/auth/v1/user");
    }
}
