//! The remote secret registry: a store of key/value secrets grouped into
//! named projects. `bws::BwsRegistry` is the production implementation.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// A registry namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// A secret key bound to its registry-assigned id. Values are never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSecret {
    pub id: String,
    pub key: String,
}

pub trait SecretRegistry {
    fn list_projects(&self) -> Result<Vec<Project>>;

    fn create_project(&self, name: &str) -> Result<Project>;

    fn list_secrets(&self, project_id: &str) -> Result<Vec<RemoteSecret>>;

    /// Create a secret in `project_id`, returning its new id.
    fn create_secret(&self, key: &str, value: &str, project_id: &str) -> Result<String>;

    fn edit_secret(&self, id: &str, key: &str, value: &str) -> Result<()>;
}

/// Point-in-time snapshot of a project's secrets: key to remote id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSecrets {
    ids: HashMap<String, String>,
}

impl RemoteSecrets {
    /// Index secrets by key. When the registry holds the same key twice the
    /// first listed entry is kept.
    pub fn from_secrets(secrets: Vec<RemoteSecret>) -> Self {
        let mut ids = HashMap::with_capacity(secrets.len());
        for secret in secrets {
            if ids.contains_key(&secret.key) {
                warn!(
                    "registry holds duplicate key '{}'; ignoring secret {}",
                    secret.key, secret.id
                );
                continue;
            }
            ids.insert(secret.key, secret.id);
        }
        Self { ids }
    }

    pub fn id_of(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RemoteSecrets {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            ids: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Look up the project called exactly `name` without creating anything.
pub fn find_project<R: SecretRegistry + ?Sized>(registry: &R, name: &str) -> Result<Option<Project>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::InvalidProjectName(name.to_string()));
    }
    let projects = registry.list_projects()?;
    Ok(projects.into_iter().find(|p| p.name == name))
}

/// Find the project called exactly `name`, creating it when none exists.
pub fn resolve_project<R: SecretRegistry + ?Sized>(registry: &R, name: &str) -> Result<Project> {
    if let Some(project) = find_project(registry, name)? {
        info!("using project '{}' ({})", project.name, project.id);
        return Ok(project);
    }
    let project = registry.create_project(name.trim())?;
    info!("created project '{}' ({})", project.name, project.id);
    Ok(project)
}

/// Snapshot every secret currently bound to `project`.
pub fn load_remote_secrets<R: SecretRegistry + ?Sized>(
    registry: &R,
    project: &Project,
) -> Result<RemoteSecrets> {
    let secrets = registry.list_secrets(&project.id)?;
    Ok(RemoteSecrets::from_secrets(secrets))
}
