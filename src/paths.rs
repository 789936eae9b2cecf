/// Centralized platform-specific path computation
use std::path::PathBuf;

const APP_DIR: &str = "git-flatten";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {config_dir}/git-flatten
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/git-flatten/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }

    /// Default root for cloned repositories.
    ///
    /// Lives next to the system temp directory so the OS may reclaim it, but
    /// is stable across restarts so existing checkouts are reused.
    ///
    /// Returns: {temp_dir}/git-flatten/repos
    pub fn default_cache_root() -> PathBuf {
        std::env::temp_dir().join(APP_DIR).join("repos")
    }
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &std::path::Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
