//! The reconciliation run: manifest, local source, remote snapshot, plan,
//! apply, reference file. Strictly in that order.
//!
//! Every local input is loaded before the first registry call, so a missing
//! manifest or env file never reaches the registry. A failure to list
//! projects or secrets aborts the run before anything is mutated.

use crate::apply::{apply_plan, ApplyReport};
use crate::config::SyncConfig;
use crate::envfile::{load_local_secrets, LocalSecrets};
use crate::error::Result;
use crate::manifest::{load_required_keys, RequiredKeys};
use crate::plan::{reconcile, Action, Plan};
use crate::reference::{omitted_keys, write_reference};
use crate::registry::{
    find_project, load_remote_secrets, resolve_project, Project, RemoteSecrets, SecretRegistry,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a dry run. `project` is `None` when the project does not exist yet.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub project_name: String,
    pub project: Option<Project>,
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub plan: Plan,
    pub report: ApplyReport,
    pub reference: PathBuf,
    /// Required keys synced but not extracted in the reference file.
    pub omitted: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceOutcome {
    pub project: Project,
    pub path: PathBuf,
    pub keys: usize,
    pub omitted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub key: String,
    pub in_source: bool,
}

struct LocalInputs {
    required: RequiredKeys,
    local: LocalSecrets,
}

fn load_local_inputs(root: &Path, config: &SyncConfig) -> Result<LocalInputs> {
    let required = load_required_keys(&config.manifest_path(root), &config.manifest_key)?;
    let local = load_local_secrets(&config.env_file_path(root))?;
    info!(
        "{} required key(s), {} local value(s)",
        required.len(),
        local.len()
    );
    Ok(LocalInputs { required, local })
}

/// Build the plan without mutating the registry.
pub fn preview<R: SecretRegistry + ?Sized>(
    root: &Path,
    config: &SyncConfig,
    registry: &R,
) -> Result<Preview> {
    config.validate()?;
    let project_name = config.project_name(root)?;
    let inputs = load_local_inputs(root, config)?;
    let project = find_project(registry, &project_name)?;
    let remote = match &project {
        Some(p) => load_remote_secrets(registry, p)?,
        None => RemoteSecrets::default(),
    };
    let plan = reconcile(&inputs.required, &inputs.local, &remote);
    Ok(Preview {
        project_name,
        project,
        plan,
    })
}

/// Full run: plan, apply, then regenerate the reference file.
pub fn sync<R: SecretRegistry + ?Sized>(
    root: &Path,
    config: &SyncConfig,
    registry: &R,
) -> Result<SyncOutcome> {
    config.validate()?;
    let project_name = config.project_name(root)?;
    let inputs = load_local_inputs(root, config)?;
    let project = resolve_project(registry, &project_name)?;
    let remote = load_remote_secrets(registry, &project)?;
    info!("{} secret(s) in project '{}'", remote.len(), project.name);

    let plan = reconcile(&inputs.required, &inputs.local, &remote);
    info!(
        "plan: {} create, {} update, {} skip",
        plan.count(Action::Create),
        plan.count(Action::Update),
        plan.count(Action::Skip)
    );

    let report = apply_plan(registry, &project, &plan);

    let reference = config.reference_path(root);
    write_reference(
        &reference,
        &project,
        &inputs.required,
        &config.registry_credential_key,
    )?;

    Ok(SyncOutcome {
        plan,
        report,
        reference,
        omitted: omitted_keys(&inputs.required),
    })
}

/// Regenerate only the reference file. The env file is not read.
pub fn emit_reference<R: SecretRegistry + ?Sized>(
    root: &Path,
    config: &SyncConfig,
    registry: &R,
) -> Result<ReferenceOutcome> {
    config.validate()?;
    let project_name = config.project_name(root)?;
    let required = load_required_keys(&config.manifest_path(root), &config.manifest_key)?;
    let project = resolve_project(registry, &project_name)?;
    let path = config.reference_path(root);
    write_reference(&path, &project, &required, &config.registry_credential_key)?;
    Ok(ReferenceOutcome {
        project,
        path,
        keys: required.len(),
        omitted: omitted_keys(&required),
    })
}

/// Required keys with whether the local source defines them. No registry access.
pub fn key_status(root: &Path, config: &SyncConfig) -> Result<Vec<KeyStatus>> {
    config.validate()?;
    let inputs = load_local_inputs(root, config)?;
    Ok(inputs
        .required
        .iter()
        .map(|key| KeyStatus {
            key: key.to_string(),
            in_source: inputs.local.contains(key),
        })
        .collect())
}
