use crate::output::{print_json, print_table};
use secretsync_core::apply::{ApplyReport, Outcome};
use secretsync_core::sync;
use std::path::Path;

use super::{connect, load_config, Overrides};

pub fn run(root: &Path, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let config = load_config(root, overrides)?;
    let registry = connect(&config)?;
    let outcome = sync::sync(root, &config, &registry)?;

    if json {
        print_json(&outcome)?;
    } else {
        print_report(&outcome.report);
        println!("\nwrote {}", outcome.reference.display());
        print_omitted(&outcome.omitted);
    }

    let report = &outcome.report;
    if report.has_failures() {
        anyhow::bail!(
            "{} of {} secret(s) failed to apply",
            report.failed,
            report.applied + report.failed
        );
    }
    Ok(())
}

fn print_report(report: &ApplyReport) {
    if !report.entries.is_empty() {
        print_table(
            &["KEY", "ACTION", "RESULT"],
            report
                .entries
                .iter()
                .map(|e| {
                    let result = match &e.outcome {
                        Outcome::Applied => "ok".to_string(),
                        Outcome::Skipped { reason } => format!("skipped: {reason}"),
                        Outcome::Failed { .. } => "failed".to_string(),
                    };
                    vec![e.key.clone(), e.action.to_string(), result]
                })
                .collect(),
        );
        println!();
    }

    println!(
        "project: {}  applied: {}  skipped: {}  failed: {}",
        report.project.name, report.applied, report.skipped, report.failed
    );

    let failures = report.failures();
    if !failures.is_empty() {
        println!("\nfailed:");
        for failure in &failures {
            println!("  {failure}");
        }
    }
    let skipped: Vec<&str> = report.skipped_keys().map(|e| e.key.as_str()).collect();
    if !skipped.is_empty() {
        println!("\nnot in source (add them to your env file): {}", skipped.join(", "));
    }
}

/// Keys that are synced but cannot appear in the Kamal secrets file.
pub fn print_omitted(omitted: &[String]) {
    if !omitted.is_empty() {
        println!(
            "left out of the secrets file (not valid variable names): {}",
            omitted.join(", ")
        );
    }
}
