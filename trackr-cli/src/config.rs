//! Configuration loading for the trackr binary.
//!
//! `base_url` is required. Everything else has a default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use trackr_client::ClientConfig;
use trackr_resolve::FieldRule;
use trackr_storage::CacheConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackrConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_usage_path")]
    pub usage_path: PathBuf,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rewriter: RewriterSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_page_size")]
    pub sweep_page_size: usize,
    #[serde(default = "default_max_sweep_pages")]
    pub max_sweep_pages: usize,
    #[serde(default)]
    pub sweep_timeout_ms: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_page_size: default_sweep_page_size(),
            max_sweep_pages: default_max_sweep_pages(),
            sweep_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriterSection {
    #[serde(default)]
    pub fields: Vec<FieldRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRuleConfig {
    pub keyword: String,
    /// Defaults to the keyword.
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub user: bool,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_usage_path() -> PathBuf {
    PathBuf::from(".trackr/usage.json")
}

fn default_ttl_secs() -> u64 {
    CacheConfig::default().ttl.as_secs()
}

fn default_sweep_page_size() -> usize {
    CacheConfig::default().sweep_page_size
}

fn default_max_sweep_pages() -> usize {
    CacheConfig::default().max_sweep_pages
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or TRACKR_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl TrackrConfig {
    /// Load and validate. `token` (from `--token` or `TRACKR_TOKEN`)
    /// replaces the file's token when given.
    pub fn load(path: Option<&Path>, token: Option<String>) -> Result<Self, ConfigError> {
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(path)?;
        if let Some(token) = token {
            config.token = Some(token);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.usage_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "usage_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.sweep_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.sweep_page_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.max_sweep_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_sweep_pages",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.sweep_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cache.sweep_timeout_ms",
                reason: "must be > 0 when set".to_string(),
            });
        }
        for rule in &self.rewriter.fields {
            if rule.keyword.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "rewriter.fields.keyword",
                    reason: "must not be empty".to_string(),
                });
            }
            if rule.field.as_deref().is_some_and(|f| f.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "rewriter.fields.field",
                    reason: format!("must not be empty for keyword {}", rule.keyword),
                });
            }
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url.trim())
            .with_timeout(Duration::from_millis(self.request_timeout_ms));
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        config
    }

    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_secs(self.cache.ttl_secs))
            .with_page_size(self.cache.sweep_page_size)
            .with_max_pages(self.cache.max_sweep_pages);
        match self.cache.sweep_timeout_ms {
            Some(ms) => config.with_sweep_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }

    pub fn field_rules(&self) -> Vec<FieldRule> {
        self.rewriter
            .fields
            .iter()
            .map(|rule| FieldRule {
                keyword: rule.keyword.trim().to_string(),
                field: rule
                    .field
                    .as_deref()
                    .unwrap_or(&rule.keyword)
                    .trim()
                    .to_string(),
                user: rule.user,
            })
            .collect()
    }
}
