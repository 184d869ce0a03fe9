use crate::error::{Result, SyncError};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// BwsConfig
// ---------------------------------------------------------------------------

/// How to reach the Bitwarden Secrets Manager CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BwsConfig {
    /// Binary name (looked up on PATH) or an explicit path.
    #[serde(default = "default_bws_binary")]
    pub binary: String,
    /// Environment variable holding the machine account access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    #[serde(default)]
    pub server_url: Option<String>,
}

fn default_bws_binary() -> String {
    "bws".to_string()
}

fn default_access_token_env() -> String {
    "BWS_ACCESS_TOKEN".to_string()
}

impl Default for BwsConfig {
    fn default() -> Self {
        Self {
            binary: default_bws_binary(),
            access_token_env: default_access_token_env(),
            server_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Contents of `.secretsync.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Registry project name; defaults to the root directory name.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Dotted path to the secret list inside the manifest.
    #[serde(default = "default_manifest_key")]
    pub manifest_key: String,
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
    #[serde(default = "default_reference")]
    pub reference: PathBuf,
    #[serde(default = "default_registry_credential_key")]
    pub registry_credential_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub bws: BwsConfig,
}

fn default_manifest() -> PathBuf {
    PathBuf::from(paths::DEFAULT_MANIFEST)
}

fn default_manifest_key() -> String {
    paths::DEFAULT_MANIFEST_KEY.to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ENV_FILE)
}

fn default_reference() -> PathBuf {
    PathBuf::from(paths::DEFAULT_REFERENCE)
}

fn default_registry_credential_key() -> String {
    paths::DEFAULT_REGISTRY_CREDENTIAL_KEY.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            project: None,
            manifest: default_manifest(),
            manifest_key: default_manifest_key(),
            env_file: default_env_file(),
            reference: default_reference(),
            registry_credential_key: default_registry_credential_key(),
            timeout_secs: default_timeout_secs(),
            bws: BwsConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load `.secretsync.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        match io::read_optional(&paths::config_path(root))? {
            Some(content) if !content.trim().is_empty() => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(project) = &self.project {
            if project.trim().is_empty() {
                return Err(SyncError::InvalidProjectName(project.clone()));
            }
        }
        if self.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.manifest_key.split('.').any(|segment| segment.is_empty()) {
            return Err(SyncError::InvalidConfig(format!(
                "manifest_key '{}' has an empty segment",
                self.manifest_key
            )));
        }
        paths::validate_env_key(&self.registry_credential_key)?;
        if self.bws.access_token_env.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "bws.access_token_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured project name, or the root directory name.
    pub fn project_name(&self, root: &Path) -> Result<String> {
        let name = match &self.project {
            Some(p) => p.trim().to_string(),
            None => paths::default_project_name(root).unwrap_or_default(),
        };
        if name.is_empty() {
            return Err(SyncError::InvalidProjectName(name));
        }
        Ok(name)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.manifest)
    }

    pub fn env_file_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.env_file)
    }

    pub fn reference_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.reference)
    }
}
