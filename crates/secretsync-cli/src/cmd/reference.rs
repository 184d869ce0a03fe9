use crate::output::print_json;
use secretsync_core::sync;
use std::path::Path;

use super::{connect, load_config, Overrides};

pub fn run(root: &Path, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let config = load_config(root, overrides)?;
    let registry = connect(&config)?;
    let outcome = sync::emit_reference(root, &config, &registry)?;

    if json {
        return print_json(&outcome);
    }
    println!(
        "wrote {} ({} key(s) from project '{}')",
        outcome.path.display(),
        outcome.keys,
        outcome.project.name
    );
    super::sync::print_omitted(&outcome.omitted);
    Ok(())
}
