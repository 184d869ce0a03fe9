//! `SecretRegistry` backed by the Bitwarden Secrets Manager CLI (`bws`).
//!
//! Every call runs `bws --output json ...` as a child process with the access
//! token passed through its environment. Calls are bounded by a timeout; on
//! expiry the child is killed and the call fails with `RegistryTimeout`.

use crate::config::BwsConfig;
use crate::error::{Result, SyncError};
use crate::registry::{Project, RemoteSecret, SecretRegistry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::Duration;
use tracing::debug;

/// Variable `bws` reads its machine account token from.
pub const ACCESS_TOKEN_VAR: &str = "BWS_ACCESS_TOKEN";

/// Cap on stderr carried into error messages.
const MAX_STDERR: usize = 2 * 1024;

#[derive(Clone)]
pub struct BwsRegistry {
    binary: PathBuf,
    access_token: String,
    server_url: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for BwsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BwsRegistry")
            .field("binary", &self.binary)
            .field("access_token", &"<redacted>")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct CreatedSecret {
    id: String,
}

impl BwsRegistry {
    pub fn new(binary: impl Into<PathBuf>, access_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            access_token: access_token.into(),
            server_url: None,
            timeout,
        }
    }

    /// Locate the binary and read the access token named by `config`.
    pub fn from_config(config: &BwsConfig, timeout: Duration) -> Result<Self> {
        let binary = which::which(&config.binary).map_err(|_| {
            SyncError::RegistryUnavailable(format!(
                "'{}' not found; install the Bitwarden Secrets Manager CLI",
                config.binary
            ))
        })?;
        let access_token = std::env::var(&config.access_token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SyncError::RegistryUnavailable(format!(
                    "{} is not set; export a machine account access token",
                    config.access_token_env
                ))
            })?;
        let mut registry = Self::new(binary, access_token, timeout);
        registry.server_url = config.server_url.clone();
        Ok(registry)
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--output", "json"]);
        if let Some(url) = &self.server_url {
            cmd.args(["--server-url", url.as_str()]);
        }
        cmd.args(args)
            .env(ACCESS_TOKEN_VAR, &self.access_token)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Run one `bws` call and return its stdout.
    fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        debug!("bws {operation}");
        let output = match execute(self.command(args), self.timeout) {
            Ok(output) => output,
            Err(ExecError::TimedOut) => {
                return Err(SyncError::RegistryTimeout {
                    operation: operation.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
            Err(ExecError::Io(e)) => {
                return Err(SyncError::RegistryUnavailable(format!(
                    "failed to run {}: {e}",
                    self.binary.display()
                )))
            }
        };
        if !output.status.success() {
            let stderr = output.stderr.trim();
            let detail = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                cap_tail(stderr, MAX_STDERR).to_string()
            };
            return Err(SyncError::RegistryUnavailable(format!(
                "bws {operation} failed: {detail}"
            )));
        }
        Ok(output.stdout)
    }

    fn run_json<T: DeserializeOwned>(&self, operation: &str, args: &[&str]) -> Result<T> {
        let stdout = self.run(operation, args)?;
        serde_json::from_str(&stdout).map_err(|e| {
            SyncError::RegistryUnavailable(format!("unexpected bws output for {operation}: {e}"))
        })
    }
}

impl SecretRegistry for BwsRegistry {
    fn list_projects(&self) -> Result<Vec<Project>> {
        self.run_json("project list", &["project", "list"])
    }

    fn create_project(&self, name: &str) -> Result<Project> {
        self.run_json("project create", &["project", "create", "--", name])
    }

    fn list_secrets(&self, project_id: &str) -> Result<Vec<RemoteSecret>> {
        self.run_json("secret list", &["secret", "list", "--", project_id])
    }

    fn create_secret(&self, key: &str, value: &str, project_id: &str) -> Result<String> {
        let created: CreatedSecret = self.run_json(
            "secret create",
            &["secret", "create", "--", key, value, project_id],
        )?;
        Ok(created.id)
    }

    fn edit_secret(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let key_arg = format!("--key={key}");
        let value_arg = format!("--value={value}");
        self.run("secret edit", &["secret", "edit", &key_arg, &value_arg, "--", id])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Process execution with timeout
// ---------------------------------------------------------------------------

struct ExecOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

enum ExecError {
    TimedOut,
    Io(std::io::Error),
}

/// Run `cmd` to completion or until `timeout` elapses.
///
/// Output is drained on dedicated threads so a chatty child cannot block on a
/// full pipe; the wait happens on a third thread so the caller can give up
/// with `recv_timeout` and kill the child.
fn execute(mut cmd: Command, timeout: Duration) -> std::result::Result<ExecOutput, ExecError> {
    let mut child = cmd.spawn().map_err(ExecError::Io)?;
    let pid = child.id();

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || read_all(stdout_handle));
    let stderr_thread = std::thread::spawn(move || read_all(stderr_handle));

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(child.wait());
    });

    let status = match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(ExecError::Io)?,
        Err(_) => {
            // Readers see EOF once the killed child's pipes close.
            kill_process(pid);
            return Err(ExecError::TimedOut);
        }
    };

    Ok(ExecOutput {
        status,
        stdout: stdout_thread.join().unwrap_or_default(),
        stderr: stderr_thread.join().unwrap_or_default(),
    })
}

fn read_all<R: Read>(handle: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_string(&mut buf);
    }
    buf
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Keep the last `max` bytes of `s`, respecting char boundaries.
fn cap_tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable fake `bws` that runs `body`.
    fn fake_bws(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("bws");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn registry(binary: PathBuf) -> BwsRegistry {
        BwsRegistry::new(binary, "test-token", Duration::from_secs(5))
    }

    #[test]
    fn list_projects_parses_json() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(
            &dir,
            r#"echo '[{"id":"p1","organizationId":"o1","name":"shop","creationDate":"2024-01-01T00:00:00Z"}]'"#,
        );
        let projects = registry(bws).list_projects().unwrap();
        assert_eq!(
            projects,
            vec![Project {
                id: "p1".into(),
                name: "shop".into()
            }]
        );
    }

    #[test]
    fn token_is_passed_through_environment() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(
            &dir,
            r#"[ "$BWS_ACCESS_TOKEN" = "test-token" ] || { echo "bad token" >&2; exit 3; }
echo '[]'"#,
        );
        assert!(registry(bws).list_secrets("p1").unwrap().is_empty());
    }

    #[test]
    fn arguments_follow_bws_cli() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args.log");
        let bws = fake_bws(
            &dir,
            &format!(
                r#"printf '%s\n' "$*" >> "{}"
echo '{{"id":"s9","key":"K","value":"v","projectId":"p1"}}'"#,
                log.display()
            ),
        );
        let registry = registry(bws).with_server_url("https://vault.example.com");
        let id = registry.create_secret("API_KEY", "-starts-with-dash", "p1").unwrap();
        assert_eq!(id, "s9");
        registry.edit_secret("s1", "API_KEY", "new value").unwrap();

        let logged = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = logged.lines().collect();
        assert_eq!(
            lines[0],
            "--output json --server-url https://vault.example.com secret create -- API_KEY -starts-with-dash p1"
        );
        assert_eq!(
            lines[1],
            "--output json --server-url https://vault.example.com secret edit --key=API_KEY --value=new value -- s1"
        );
    }

    #[test]
    fn nonzero_exit_is_unavailable_with_stderr() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(&dir, "echo '[401 Unauthorized] invalid token' >&2\nexit 1");
        let err = registry(bws).list_projects().unwrap_err();
        match err {
            SyncError::RegistryUnavailable(msg) => assert!(msg.contains("401"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_output_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(&dir, "echo 'not json'");
        assert!(matches!(
            registry(bws).list_projects(),
            Err(SyncError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn hanging_call_times_out() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(&dir, "sleep 30");
        let registry = BwsRegistry::new(bws, "t", Duration::from_millis(200));
        let start = std::time::Instant::now();
        let err = registry.list_projects().unwrap_err();
        assert!(matches!(err, SyncError::RegistryTimeout { .. }), "{err}");
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let registry = registry(dir.path().join("does-not-exist"));
        assert!(matches!(
            registry.list_projects(),
            Err(SyncError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn from_config_requires_token() {
        let dir = TempDir::new().unwrap();
        let bws = fake_bws(&dir, "echo '[]'");
        let config = BwsConfig {
            binary: bws.display().to_string(),
            access_token_env: "SECRETSYNC_TEST_UNSET_TOKEN_VAR".to_string(),
            server_url: None,
        };
        assert!(matches!(
            BwsRegistry::from_config(&config, Duration::from_secs(1)),
            Err(SyncError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn debug_output_hides_token() {
        let registry = BwsRegistry::new("bws", "very-secret-token", Duration::from_secs(1));
        assert!(!format!("{registry:?}").contains("very-secret-token"));
    }

    #[test]
    fn cap_tail_keeps_end() {
        assert_eq!(cap_tail("abcdef", 3), "def");
        assert_eq!(cap_tail("abc", 10), "abc");
        assert_eq!(cap_tail("aé", 1), "");
    }
}
