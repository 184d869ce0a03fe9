use crate::output::{print_json, print_table};
use secretsync_core::sync;
use std::path::Path;

use super::{load_config, Overrides};

/// List required keys and whether the env file defines them. Never touches the registry.
pub fn run(root: &Path, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let config = load_config(root, overrides)?;
    let status = sync::key_status(root, &config)?;

    if json {
        return print_json(&status);
    }
    if status.is_empty() {
        println!("no secrets declared in {}", config.manifest.display());
        return Ok(());
    }
    print_table(
        &["KEY", "IN SOURCE"],
        status
            .iter()
            .map(|s| {
                vec![
                    s.key.clone(),
                    if s.in_source { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect(),
    );
    let missing = status.iter().filter(|s| !s.in_source).count();
    if missing > 0 {
        println!("\n{missing} key(s) missing from {}", config.env_file.display());
    }
    Ok(())
}
