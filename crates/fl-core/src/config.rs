use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::StatusTag;

/// Top-level configuration loaded from `~/.forgelink/config.toml`.
///
/// **Security**: This struct NEVER stores API tokens. The forge token is read
/// from the environment variable named by [`GitHubSettings::token_env`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub linking: LinkingConfig,
    /// Icon overrides keyed by [`StatusTag::icon_key`].
    #[serde(default)]
    pub icons: BTreeMap<String, String>,
}

impl Config {
    /// Load config from `~/.forgelink/config.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.github.validate()?;
        self.cache.validate()?;
        self.linking.validate()?;
        Ok(())
    }

    /// Icon shown next to an item with the given tag.
    pub fn icon_for(&self, tag: StatusTag) -> String {
        self.icons
            .get(tag.icon_key())
            .cloned()
            .unwrap_or_else(|| format!(":{}:", tag.icon_key()))
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".forgelink")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Name of the env var holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            graphql_url: default_graphql_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

impl GitHubSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the token from the configured environment variable, if set.
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("github.api_base", &self.api_base), ("github.graphql_url", &self.graphql_url)] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be an http(s) url, got '{value}'"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "github.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_graphql_url() -> String {
    "https://api.github.com/graphql".into()
}
fn default_user_agent() -> String {
    "forgelink".into()
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for validator-bearing responses.
    #[serde(default = "default_item_ttl_secs")]
    pub item_ttl_secs: u64,
    /// TTL for validator-less repository listings.
    #[serde(default = "default_index_ttl_secs")]
    pub index_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            item_ttl_secs: default_item_ttl_secs(),
            index_ttl_secs: default_index_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn item_ttl(&self) -> Duration {
        Duration::from_secs(self.item_ttl_secs)
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.item_ttl_secs == 0 || self.index_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache ttls must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_item_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_index_ttl_secs() -> u64 {
    30 * 60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkingConfig {
    /// Most distinct references one unit may carry.
    #[serde(default = "default_max_references")]
    pub max_references: usize,
    /// Idle lifetime of a display record.
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
    #[serde(default = "default_labels_limit")]
    pub labels_limit: usize,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            max_references: default_max_references(),
            record_ttl_secs: default_record_ttl_secs(),
            description_limit: default_description_limit(),
            labels_limit: default_labels_limit(),
        }
    }
}

impl LinkingConfig {
    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_references == 0 {
            return Err(ConfigError::Validation(
                "linking.max_references must be greater than zero".to_string(),
            ));
        }
        if self.record_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "linking.record_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.description_limit < 4 || self.labels_limit < 4 {
            return Err(ConfigError::Validation(
                "linking.description_limit and linking.labels_limit must be at least 4".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_references() -> usize {
    6
}
fn default_record_ttl_secs() -> u64 {
    600
}
fn default_description_limit() -> usize {
    2700
}
fn default_labels_limit() -> usize {
    1024
}
