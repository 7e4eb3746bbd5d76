//! Configuration Management
//!
//! Persistent defaults for the `resgraph` binary. Command-line flags take
//! precedence over anything stored here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Page size used when neither the CLI nor the config picks one
pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// API root all paths are resolved against
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    /// Page size for collection fetches
    #[serde(default)]
    pub page_limit: Option<u64>,
    /// Identity map entry lifetime, in seconds
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Per-user directory holding the config file and the log
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("resgraph"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or unreadable files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Effective base URL (CLI > config)
    pub fn effective_base_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.base_url.clone())
    }

    /// Effective token (CLI > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.token.clone())
    }

    /// Effective page size (CLI > config > default)
    pub fn effective_page_limit(&self, cli: Option<u64>) -> u64 {
        cli.or(self.page_limit).unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    /// Identity map TTL, if configured
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| crate::transport::DEFAULT_USER_AGENT.to_string())
    }
}
