//! Provider chain configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/bonscan/config/providers.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! The order of `[[providers]]` entries is the fallback order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../../config/providers.toml");

/// Per-call timeout bounds, in seconds
const MIN_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 60;

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout_secs() -> u64 {
    45
}

fn default_temperature() -> f32 {
    0.1
}

/// Provider implementation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// HTTP text-completion endpoint (accepts both known response shapes)
    #[default]
    Http,
    /// In-process mock (testing and development)
    Mock,
}

/// One provider entry in the chain
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer token
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ProviderEntry {
    /// Per-call timeout, clamped to the supported bounds
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }
}

/// Ordered provider chain configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

impl ChainConfig {
    /// Load the config, preferring the override file over embedded defaults
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path().as_deref())
    }

    /// Load from an explicit path, falling back to embedded defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if path.exists() {
                let content = fs::read_to_string(path)?;
                debug!(path = %path.display(), "loading provider config override");
                return Self::parse(&content);
            }
        }
        Self::parse(DEFAULT_CONFIG)
    }

    /// Parse a TOML config string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidData(format!("Invalid provider config: {}", e)))
    }

    /// Default override file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("bonscan").join("config").join("providers.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config = ChainConfig::parse(DEFAULT_CONFIG).unwrap();
        assert!(!config.providers.is_empty());
        // Fallback order is the file order.
        assert_eq!(config.providers[0].name, "ollama");
        assert_eq!(config.providers[0].kind, ProviderKind::Http);
    }

    #[test]
    fn test_timeout_is_clamped() {
        let config = ChainConfig::parse(
            r#"
            [[providers]]
            name = "fast"
            url = "http://h"
            timeout_secs = 5

            [[providers]]
            name = "slow"
            url = "http://h"
            timeout_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.providers[0].timeout(), Duration::from_secs(30));
        assert_eq!(config.providers[1].timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_defaults_applied() {
        let config = ChainConfig::parse(
            r#"
            [[providers]]
            name = "minimal"
            url = "http://h"
            "#,
        )
        .unwrap();

        let entry = &config.providers[0];
        assert_eq!(entry.kind, ProviderKind::Http);
        assert_eq!(entry.model, "llama3.2");
        assert_eq!(entry.timeout_secs, 45);
        assert!(entry.api_key_env.is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(ChainConfig::parse("providers = [[").is_err());
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let config =
            ChainConfig::load_from(Some(Path::new("/nonexistent/providers.toml"))).unwrap();
        assert!(!config.providers.is_empty());
    }
}
