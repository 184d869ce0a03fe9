use crate::output::{print_json, print_table};
use secretsync_core::plan::{Action, Plan, PlanEntry};
use secretsync_core::sync;
use std::path::Path;

use super::{connect, load_config, Overrides};

pub fn run(root: &Path, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let config = load_config(root, overrides)?;
    let registry = connect(&config)?;
    let preview = sync::preview(root, &config, &registry)?;

    if json {
        return print_json(&preview);
    }

    if preview.project.is_none() {
        println!(
            "project '{}' does not exist yet; sync will create it\n",
            preview.project_name
        );
    }
    if preview.plan.is_empty() {
        println!("no secrets declared in {}", config.manifest.display());
        return Ok(());
    }
    print_plan(&preview.plan);
    println!(
        "\n{} to create, {} to update, {} skipped",
        preview.plan.count(Action::Create),
        preview.plan.count(Action::Update),
        preview.plan.count(Action::Skip)
    );
    Ok(())
}

pub fn print_plan(plan: &Plan) {
    print_table(
        &["KEY", "ACTION", "DETAIL"],
        plan.iter()
            .map(|entry| {
                let detail = match entry {
                    PlanEntry::Create { .. } => String::new(),
                    PlanEntry::Update { remote_id, .. } => remote_id.clone(),
                    PlanEntry::Skip { reason, .. } => reason.to_string(),
                };
                vec![entry.key().to_string(), entry.action().to_string(), detail]
            })
            .collect(),
    );
}
