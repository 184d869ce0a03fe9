//! Kamal secrets file generation.
//!
//! Kamal evaluates `.kamal/secrets` as dotenv with command substitution, so the
//! file fetches the whole project bundle once and extracts each key from it.

use crate::error::Result;
use crate::io;
use crate::manifest::RequiredKeys;
use crate::paths;
use crate::registry::Project;
use std::path::Path;
use tracing::{info, warn};

pub const HEADER: &str = "# Generated by secretsync; do not edit.";
const BUNDLE_VAR: &str = "SECRETS";

/// Render the reference file for `project`. `credential_key` is always
/// extracted, first and only once.
pub fn render_reference(project: &Project, required: &RequiredKeys, credential_key: &str) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!(
        "{BUNDLE_VAR}=$(kamal secrets fetch --adapter bitwarden-sm {}/all)\n",
        project.id
    ));

    let keys = std::iter::once(credential_key)
        .chain(required.iter().filter(|k| *k != credential_key));
    for key in keys {
        if !paths::is_valid_env_key(key) {
            warn!("'{key}' is not a valid variable name; leaving it out of the secrets file");
            continue;
        }
        out.push_str(&format!(
            "{key}=$(kamal secrets extract {key} ${BUNDLE_VAR})\n"
        ));
    }
    out
}

/// Required keys that cannot be written as variable assignments and are left
/// out of the reference file.
pub fn omitted_keys(required: &RequiredKeys) -> Vec<String> {
    required
        .iter()
        .filter(|key| !paths::is_valid_env_key(key))
        .map(str::to_string)
        .collect()
}

/// Render and atomically replace the reference file at `path`.
pub fn write_reference(
    path: &Path,
    project: &Project,
    required: &RequiredKeys,
    credential_key: &str,
) -> Result<String> {
    let text = render_reference(project, required, credential_key);
    io::atomic_write(path, text.as_bytes())?;
    info!("wrote {}", path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> Project {
        Project {
            id: "f1e2d3".into(),
            name: "shop".into(),
        }
    }

    #[test]
    fn renders_fetch_then_extractions() {
        let text = render_reference(
            &project(),
            &RequiredKeys::new(["API_KEY", "DB_PASS"]),
            "KAMAL_REGISTRY_PASSWORD",
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                HEADER,
                "SECRETS=$(kamal secrets fetch --adapter bitwarden-sm f1e2d3/all)",
                "KAMAL_REGISTRY_PASSWORD=$(kamal secrets extract KAMAL_REGISTRY_PASSWORD $SECRETS)",
                "API_KEY=$(kamal secrets extract API_KEY $SECRETS)",
                "DB_PASS=$(kamal secrets extract DB_PASS $SECRETS)",
            ]
        );
    }

    #[test]
    fn credential_key_is_not_duplicated() {
        let text = render_reference(
            &project(),
            &RequiredKeys::new(["API_KEY", "KAMAL_REGISTRY_PASSWORD"]),
            "KAMAL_REGISTRY_PASSWORD",
        );
        assert_eq!(text.matches("KAMAL_REGISTRY_PASSWORD=").count(), 1);
    }

    #[test]
    fn empty_manifest_still_extracts_credential() {
        let text = render_reference(&project(), &RequiredKeys::default(), "KAMAL_REGISTRY_PASSWORD");
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("$SECRETS)\n"));
    }

    #[test]
    fn invalid_names_are_left_out() {
        let text = render_reference(
            &project(),
            &RequiredKeys::new(["OK_KEY", "not-valid"]),
            "KAMAL_REGISTRY_PASSWORD",
        );
        assert!(text.contains("OK_KEY="));
        assert!(!text.contains("not-valid"));
    }

    #[test]
    fn omitted_keys_lists_invalid_names_in_order() {
        let required = RequiredKeys::new(["OK_KEY", "not-valid", "9LIVES", "ALSO_OK"]);
        assert_eq!(omitted_keys(&required), vec!["not-valid", "9LIVES"]);
        assert!(omitted_keys(&RequiredKeys::new(["A", "B"])).is_empty());
    }

    #[test]
    fn write_replaces_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".kamal/secrets");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "STALE=1\n").unwrap();

        let text = write_reference(
            &path,
            &project(),
            &RequiredKeys::new(["API_KEY"]),
            "KAMAL_REGISTRY_PASSWORD",
        )
        .unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, text);
        assert!(!on_disk.contains("STALE"));
    }
}
