//! Execute a plan against the registry, one independent call per entry.

use crate::error::SyncError;
use crate::plan::{Action, Plan, PlanEntry};
use crate::registry::{Project, SecretRegistry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub key: String,
    pub action: Action,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub project: Project,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub entries: Vec<EntryReport>,
    pub finished_at: DateTime<Utc>,
}

impl ApplyReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Failed entries as `ApplyFailed` errors, in plan order.
    pub fn failures(&self) -> Vec<SyncError> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                Outcome::Failed { reason } => Some(SyncError::ApplyFailed {
                    key: e.key.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_keys(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Skipped { .. }))
    }
}

/// Apply every create/update in `plan`. A failing entry is recorded and the
/// remaining entries still run; nothing is retried.
pub fn apply_plan<R: SecretRegistry + ?Sized>(
    registry: &R,
    project: &Project,
    plan: &Plan,
) -> ApplyReport {
    let mut entries = Vec::with_capacity(plan.len());
    let (mut applied, mut skipped, mut failed) = (0, 0, 0);

    for entry in plan {
        let result = match entry {
            PlanEntry::Skip { key, reason } => {
                warn!("skipping {key}: {reason}");
                skipped += 1;
                entries.push(EntryReport {
                    key: key.clone(),
                    action: Action::Skip,
                    outcome: Outcome::Skipped {
                        reason: reason.to_string(),
                    },
                });
                continue;
            }
            PlanEntry::Create { key, value } => registry
                .create_secret(key, value, &project.id)
                .map(|id| info!("created {key} ({id})")),
            PlanEntry::Update {
                key,
                value,
                remote_id,
            } => registry
                .edit_secret(remote_id, key, value)
                .map(|()| info!("updated {key} ({remote_id})")),
        };

        let outcome = match result {
            Ok(()) => {
                applied += 1;
                Outcome::Applied
            }
            Err(e) => {
                let failure = SyncError::ApplyFailed {
                    key: entry.key().to_string(),
                    reason: e.to_string(),
                };
                warn!("{failure}");
                failed += 1;
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        entries.push(EntryReport {
            key: entry.key().to_string(),
            action: entry.action(),
            outcome,
        });
    }

    ApplyReport {
        project: project.clone(),
        applied,
        skipped,
        failed,
        entries,
        finished_at: Utc::now(),
    }
}
