//! In-memory registry for exercising the reconciler without `bws`.

use crate::error::{Result, SyncError};
use crate::registry::{Project, RemoteSecret, SecretRegistry};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Number of calls made to each registry operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub list_projects: usize,
    pub create_project: usize,
    pub list_secrets: usize,
    pub create_secret: usize,
    pub edit_secret: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.list_projects
            + self.create_project
            + self.list_secrets
            + self.create_secret
            + self.edit_secret
    }

    pub fn mutations(&self) -> usize {
        self.create_project + self.create_secret + self.edit_secret
    }
}

#[derive(Debug, Clone)]
struct StoredSecret {
    project_id: String,
    id: String,
    key: String,
    value: String,
}

#[derive(Debug, Default)]
struct State {
    projects: Vec<Project>,
    secrets: Vec<StoredSecret>,
    calls: Calls,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct MemoryRegistry {
    state: Arc<Mutex<State>>,
    fail_listing: bool,
    fail_secret_listing: bool,
    timeout_secret_listing: bool,
    failing_keys: HashSet<String>,
    timing_out_keys: HashSet<String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_secret(self, project_id: &str, id: &str, key: &str, value: &str) -> Self {
        self.state.lock().unwrap().secrets.push(StoredSecret {
            project_id: project_id.to_string(),
            id: id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// `list_projects` fails as if the registry were unreachable.
    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn fail_secret_listing(mut self) -> Self {
        self.fail_secret_listing = true;
        self
    }

    pub fn timeout_secret_listing(mut self) -> Self {
        self.timeout_secret_listing = true;
        self
    }

    /// Create/edit calls for `key` fail.
    pub fn fail_key(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// Create/edit calls for `key` time out.
    pub fn timeout_key(mut self, key: &str) -> Self {
        self.timing_out_keys.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.lock().unwrap().projects.clone()
    }

    pub fn value_of(&self, project_id: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .iter()
            .find(|s| s.project_id == project_id && s.key == key)
            .map(|s| s.value.clone())
    }

    pub fn secret_count(&self, project_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .secrets
            .iter()
            .filter(|s| s.project_id == project_id)
            .count()
    }

    fn check_key(&self, key: &str, operation: &str) -> Result<()> {
        if self.timing_out_keys.contains(key) {
            return Err(SyncError::RegistryTimeout {
                operation: operation.to_string(),
                secs: 30,
            });
        }
        if self.failing_keys.contains(key) {
            return Err(SyncError::RegistryUnavailable(format!(
                "{operation} rejected for {key}"
            )));
        }
        Ok(())
    }
}

impl SecretRegistry for MemoryRegistry {
    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut state = self.state.lock().unwrap();
        state.calls.list_projects += 1;
        if self.fail_listing {
            return Err(SyncError::RegistryUnavailable("connection refused".into()));
        }
        Ok(state.projects.clone())
    }

    fn create_project(&self, name: &str) -> Result<Project> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_project += 1;
        state.next_id += 1;
        let project = Project {
            id: format!("project-{}", state.next_id),
            name: name.to_string(),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    fn list_secrets(&self, project_id: &str) -> Result<Vec<RemoteSecret>> {
        let mut state = self.state.lock().unwrap();
        state.calls.list_secrets += 1;
        if self.timeout_secret_listing {
            return Err(SyncError::RegistryTimeout {
                operation: "secret list".into(),
                secs: 30,
            });
        }
        if self.fail_secret_listing {
            return Err(SyncError::RegistryUnavailable("connection refused".into()));
        }
        Ok(state
            .secrets
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| RemoteSecret {
                id: s.id.clone(),
                key: s.key.clone(),
            })
            .collect())
    }

    fn create_secret(&self, key: &str, value: &str, project_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_secret += 1;
        self.check_key(key, "secret create")?;
        state.next_id += 1;
        let id = format!("secret-{}", state.next_id);
        state.secrets.push(StoredSecret {
            project_id: project_id.to_string(),
            id: id.clone(),
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(id)
    }

    fn edit_secret(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.edit_secret += 1;
        self.check_key(key, "secret edit")?;
        let secret = state
            .secrets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SyncError::RegistryUnavailable(format!("secret {id} not found")))?;
        secret.key = key.to_string();
        secret.value = value.to_string();
        Ok(())
    }
}
