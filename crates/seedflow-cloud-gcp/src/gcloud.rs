//! gcloud CLI wrapper
//!
//! Wraps the gcloud CLI commands used by the bootstrap. In dry-run mode
//! nothing is executed: mutating commands are recorded for display and
//! reads behave as if nothing exists yet.

use crate::error::{GcpError, Result};
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;

/// gcloud CLI wrapper
pub struct Gcloud {
    dry_run: bool,
    recorded: Mutex<Vec<String>>,
}

/// Entry of `gcloud auth list --format=json`
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialedAccount {
    pub account: String,
    pub status: String,
}

impl Gcloud {
    pub fn new() -> Self {
        Self {
            dry_run: false,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Record mutating commands instead of running them
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Mutating commands recorded so far (dry-run only)
    pub fn recorded(&self) -> Vec<String> {
        match self.recorded.lock() {
            Ok(recorded) => recorded.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Check if gcloud is installed and has an active account
    pub async fn check_auth(&self) -> Result<CredentialedAccount> {
        let which = Command::new("which").arg("gcloud").output().await?;
        if !which.status.success() {
            return Err(GcpError::GcloudNotFound);
        }

        let output = self
            .run_command(&["auth", "list", "--filter=status:ACTIVE", "--format=json"])
            .await?;

        let accounts: Vec<CredentialedAccount> = serde_json::from_str(&output)?;
        accounts.into_iter().next().ok_or_else(|| {
            GcpError::AuthenticationFailed(
                "アクティブなアカウントがありません。`gcloud auth login` を実行してください"
                    .to_string(),
            )
        })
    }

    /// Run a read-only command and return stdout
    pub async fn read(&self, args: &[&str]) -> Result<String> {
        if self.dry_run {
            return Ok(String::new());
        }
        self.run_command(args).await
    }

    /// Run a describe-style command; `None` when the resource does not exist
    pub async fn probe(&self, args: &[&str]) -> Result<Option<String>> {
        if self.dry_run {
            return Ok(None);
        }

        match self.run_command(args).await {
            Ok(output) => Ok(Some(output.trim().to_string())),
            Err(GcpError::CommandFailed { stderr, .. }) if is_not_found(&stderr) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run a mutating command
    pub async fn mutate(&self, args: &[&str]) -> Result<()> {
        if self.dry_run {
            let line = render_command(args);
            tracing::debug!("Dry run: {}", line);
            if let Ok(mut recorded) = self.recorded.lock() {
                recorded.push(line);
            }
            return Ok(());
        }

        self.run_command(args).await.map(|_| ())
    }

    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("gcloud");
        cmd.args(args);
        cmd.arg("--quiet");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {}", render_command(args));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GcpError::GcloudNotFound
            } else {
                GcpError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GcpError::CommandFailed {
                command: render_command(args),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether gcloud's stderr says the resource is missing
pub fn is_not_found(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    stderr.contains("NOT_FOUND")
        || lower.contains("not found")
        || lower.contains("does not exist")
        || lower.contains("or it may not exist")
}

/// Render a command line that can be pasted into a POSIX shell
pub fn render_command(args: &[&str]) -> String {
    let mut line = String::from("gcloud");
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '@')
        });
    if plain {
        return arg.to_string();
    }

    if !arg.contains('\'') {
        return format!("'{}'", arg);
    }

    let mut quoted = String::from("\"");
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
