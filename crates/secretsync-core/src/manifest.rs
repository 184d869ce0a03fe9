//! Required secret keys, read from a Kamal deploy manifest.
//!
//! The keys live in a YAML list reached by a dotted path (`env.secret` by
//! default):
//!
//! ```yaml
//! env:
//!   secret:
//!     - API_KEY
//!     - DB_PASS
//! ```

use crate::error::{Result, SyncError};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Deduplicated secret key names in first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredKeys {
    keys: Vec<String>,
}

impl RequiredKeys {
    /// Build from raw entries: trims each, drops empties, keeps the first of any duplicate.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keys = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(k.clone()))
            .collect();
        Self { keys }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }
}

impl<S: AsRef<str>> FromIterator<S> for RequiredKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Read the manifest at `path` and return the keys listed under `key_path`.
pub fn load_required_keys(path: &Path, key_path: &str) -> Result<RequiredKeys> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::ManifestMissing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    parse_required_keys(&content, key_path)
}

/// Parse manifest text. A manifest without the list declares no secrets;
/// a value at `key_path` that is not a list of strings is malformed.
pub fn parse_required_keys(content: &str, key_path: &str) -> Result<RequiredKeys> {
    let doc: Value = serde_yaml::from_str(content)
        .map_err(|e| SyncError::ManifestMalformed(format!("invalid YAML: {e}")))?;

    let Some(node) = lookup(&doc, key_path) else {
        warn!("manifest has no '{key_path}' list; no secrets declared");
        return Ok(RequiredKeys::default());
    };

    let entries = match node {
        Value::Null => return Ok(RequiredKeys::default()),
        Value::Sequence(items) => items,
        other => {
            return Err(SyncError::ManifestMalformed(format!(
                "'{key_path}' must be a list, found {}",
                type_name(other)
            )))
        }
    };

    let mut keys = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            Value::String(s) => keys.push(s.as_str()),
            Value::Null => {}
            other => {
                return Err(SyncError::ManifestMalformed(format!(
                    "'{key_path}[{i}]' must be a string, found {}",
                    type_name(other)
                )))
            }
        }
    }
    Ok(RequiredKeys::new(keys))
}

fn lookup<'a>(doc: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(doc, |node, segment| node.as_mapping()?.get(segment))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
