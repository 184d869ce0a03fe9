pub mod keys;
pub mod plan;
pub mod reference;
pub mod sync;

use anyhow::Context;
use clap::Args;
use secretsync_core::bws::BwsRegistry;
use secretsync_core::config::SyncConfig;
use std::path::{Path, PathBuf};

/// Per-invocation overrides for `.secretsync.yaml`.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Bitwarden project name (default: project root directory name)
    #[arg(long, global = true, env = "SECRETSYNC_PROJECT")]
    pub project: Option<String>,

    /// Deploy manifest listing the secret names
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Local KEY=VALUE file holding the secret values
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Where to write the Kamal secrets file
    #[arg(long, global = true)]
    pub reference: Option<PathBuf>,

    /// Seconds to wait for each bws call
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Path to the bws binary
    #[arg(long, global = true, env = "SECRETSYNC_BWS")]
    pub bws: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut SyncConfig) {
        if let Some(project) = self.project {
            config.project = Some(project);
        }
        if let Some(manifest) = self.manifest {
            config.manifest = manifest;
        }
        if let Some(env_file) = self.env_file {
            config.env_file = env_file;
        }
        if let Some(reference) = self.reference {
            config.reference = reference;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(bws) = self.bws {
            config.bws.binary = bws;
        }
    }
}

/// Load `.secretsync.yaml` under `root` and layer the CLI overrides on top.
pub fn load_config(root: &Path, overrides: Overrides) -> anyhow::Result<SyncConfig> {
    let mut config = SyncConfig::load(root)
        .with_context(|| format!("failed to load config from {}", root.display()))?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

pub fn connect(config: &SyncConfig) -> anyhow::Result<BwsRegistry> {
    let registry = BwsRegistry::from_config(&config.bws, config.timeout())
        .context("cannot use Bitwarden Secrets Manager")?;
    tracing::debug!("using {}", registry.binary().display());
    Ok(registry)
}
