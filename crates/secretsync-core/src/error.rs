use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("manifest malformed: {0}")]
    ManifestMalformed(String),

    #[error("secrets source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("secret registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("secret registry call '{operation}' timed out after {secs}s")]
    RegistryTimeout { operation: String, secs: u64 },

    #[error("failed to apply '{key}': {reason}")]
    ApplyFailed { key: String, reason: String },

    #[error("invalid project name '{0}': must be non-empty")]
    InvalidProjectName(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
