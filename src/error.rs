/// Centralized error types for git-flatten using thiserror
///
/// Every tool call either returns a complete result or exactly one of these,
/// rendered as a human-readable message naming the offending input.
use std::io;
use std::path::Path;
use thiserror::Error;

/// Main error type for materialization and flattening
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Clone error: {0}")]
    Clone(#[from] CloneError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while producing a local checkout of a remote repository
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("git clone of '{url}' failed: {message}")]
    Failed { url: String, message: String },

    #[error("git clone of '{url}' timed out after {secs} seconds")]
    TimedOut { url: String, secs: u64 },

    #[error("Failed to run '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Clone of '{0}' did not produce a git checkout")]
    NotACheckout(String),

    #[error("Failed to prepare cache directory '{path}': {reason}")]
    CacheDir { path: String, reason: String },

    #[error("Timed out waiting for another process to finish cloning '{0}'")]
    LockTimeout(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Result alias used throughout the engine
pub type Result<T, E = FlattenError> = std::result::Result<T, E>;

impl From<anyhow::Error> for FlattenError {
    fn from(err: anyhow::Error) -> Self {
        FlattenError::Other(format!("{:#}", err))
    }
}

impl FlattenError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        FlattenError::Other(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        FlattenError::InvalidInput(msg.into())
    }

    /// Classify an I/O failure on `path` into the caller-facing kinds.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FlattenError::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => {
                FlattenError::PermissionDenied(path.display().to_string())
            }
            kind => FlattenError::Io(io::Error::new(
                kind,
                format!("{}: {}", path.display(), err),
            )),
        }
    }

    /// Check if this is a caller mistake (bad reference, missing path) vs a system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            FlattenError::InvalidInput(_)
                | FlattenError::NotFound(_)
                | FlattenError::Config(ConfigError::InvalidValue { .. })
        )
    }
}
