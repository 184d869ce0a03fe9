use crate::error::{Result, SyncError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".secretsync.yaml";
pub const DEFAULT_MANIFEST: &str = "config/deploy.yml";
pub const DEFAULT_MANIFEST_KEY: &str = "env.secret";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_REFERENCE: &str = ".kamal/secrets";

/// Credential Kamal needs to pull images; always extracted into the reference file.
pub const DEFAULT_REGISTRY_CREDENTIAL_KEY: &str = "KAMAL_REGISTRY_PASSWORD";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Project name used when none is configured: the root directory's name.
pub fn default_project_name(root: &Path) -> Option<String> {
    let canonical = root.canonicalize().ok()?;
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

// ---------------------------------------------------------------------------
// Key validation
// ---------------------------------------------------------------------------

static ENV_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn env_key_re() -> &'static Regex {
    ENV_KEY_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

pub fn is_valid_env_key(key: &str) -> bool {
    env_key_re().is_match(key)
}

pub fn validate_env_key(key: &str) -> Result<()> {
    if !is_valid_env_key(key) {
        return Err(SyncError::InvalidConfig(format!(
            "'{key}' is not a valid environment variable name"
        )));
    }
    Ok(())
}
