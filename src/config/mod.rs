/// Configuration system for git-flatten
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, FlattenError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Repository cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Tree walking configuration
    #[serde(default)]
    pub walk: WalkConfig,
}

/// Repository cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one checkout per repository
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,

    /// Seconds a checkout is reused before it is cloned again (0 = never expire)
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Upper bound on a single clone operation, in seconds
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,

    /// git executable used for cloning
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

/// Tree walking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Files larger than this (in bytes) are listed without content
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_cache_root() -> PathBuf {
    crate::paths::PlatformPaths::default_cache_root()
}

fn default_freshness_secs() -> u64 {
    3600
}

fn default_clone_timeout_secs() -> u64 {
    300
}

fn default_git_binary() -> String {
    "git".to_string()
}

pub(crate) fn default_max_file_size() -> u64 {
    1_048_576 // 1 MB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            freshness_secs: default_freshness_secs(),
            clone_timeout_secs: default_clone_timeout_secs(),
            git_binary: default_git_binary(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

impl CacheConfig {
    /// Freshness window, or `None` when entries never expire
    pub fn freshness(&self) -> Option<Duration> {
        (self.freshness_secs > 0).then(|| Duration::from_secs(self.freshness_secs))
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, FlattenError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, FlattenError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), FlattenError> {
        if self.cache.root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cache.root".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.cache.clone_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cache.clone_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.cache.git_binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cache.git_binary".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.walk.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "walk.max_file_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("GIT_FLATTEN_CACHE_DIR")
            && !root.is_empty()
        {
            self.cache.root = PathBuf::from(root);
        }

        if let Ok(secs) = std::env::var("GIT_FLATTEN_FRESHNESS_SECS")
            && let Ok(secs) = secs.parse()
        {
            self.cache.freshness_secs = secs;
        }

        if let Ok(secs) = std::env::var("GIT_FLATTEN_CLONE_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse()
        {
            self.cache.clone_timeout_secs = secs;
        }

        if let Ok(git) = std::env::var("GIT_FLATTEN_GIT") {
            self.cache.git_binary = git;
        }

        if let Ok(size) = std::env::var("GIT_FLATTEN_MAX_FILE_SIZE")
            && let Ok(size) = size.parse()
        {
            self.walk.max_file_size = size;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, FlattenError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
