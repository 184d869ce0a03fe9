//! Local `KEY=VALUE` secrets source.

use crate::error::{Result, SyncError};
use crate::paths;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Secret values read from the local env file, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSecrets {
    values: HashMap<String, String>,
}

impl LocalSecrets {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalSecrets {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Read the env file at `path`.
pub fn load_local_secrets(path: &Path) -> Result<LocalSecrets> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::SourceMissing(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(parse_env(&content))
}

/// Parse env file content. Later definitions of a key replace earlier ones.
pub fn parse_env(content: &str) -> LocalSecrets {
    let mut values = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        if let Some((key, value)) = parse_line(line) {
            values.insert(key.to_string(), value.to_string());
        } else if !is_ignorable(line) {
            debug!("ignoring unparsable env line {}", lineno + 1);
        }
    }
    LocalSecrets { values }
}

fn is_ignorable(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with('#')
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    if is_ignorable(line) {
        return None;
    }
    let line = line.trim_start();
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    if !paths::is_valid_env_key(key) {
        return None;
    }
    Some((key, unquote(value)))
}

/// Strip one layer of matching single or double quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
