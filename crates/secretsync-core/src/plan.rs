//! Reconciliation planning: decide, per required key, whether the registry
//! needs a create, an update, or nothing at all.

use crate::envfile::LocalSecrets;
use crate::manifest::RequiredKeys;
use crate::registry::RemoteSecrets;
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Skip,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFoundInSource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFoundInSource => f.write_str("not found in source"),
        }
    }
}

/// One planned action. Values are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanEntry {
    Create {
        key: String,
        #[serde(skip_serializing)]
        value: String,
    },
    Update {
        key: String,
        #[serde(skip_serializing)]
        value: String,
        remote_id: String,
    },
    Skip {
        key: String,
        reason: SkipReason,
    },
}

impl PlanEntry {
    pub fn key(&self) -> &str {
        match self {
            PlanEntry::Create { key, .. }
            | PlanEntry::Update { key, .. }
            | PlanEntry::Skip { key, .. } => key,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            PlanEntry::Create { .. } => Action::Create,
            PlanEntry::Update { .. } => Action::Update,
            PlanEntry::Skip { .. } => Action::Skip,
        }
    }
}

/// Ordered plan, one entry per required key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action() == action).count()
    }

    /// True when nothing would be sent to the registry.
    pub fn is_noop(&self) -> bool {
        self.entries.iter().all(|e| e.action() == Action::Skip)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Build the plan. Pure: the same inputs always give the same plan.
pub fn reconcile(required: &RequiredKeys, local: &LocalSecrets, remote: &RemoteSecrets) -> Plan {
    let entries = required
        .iter()
        .map(|key| match (local.get(key), remote.id_of(key)) {
            (None, _) => PlanEntry::Skip {
                key: key.to_string(),
                reason: SkipReason::NotFoundInSource,
            },
            (Some(value), Some(remote_id)) => PlanEntry::Update {
                key: key.to_string(),
                value: value.to_string(),
                remote_id: remote_id.to_string(),
            },
            (Some(value), None) => PlanEntry::Create {
                key: key.to_string(),
                value: value.to_string(),
            },
        })
        .collect();
    Plan { entries }
}
