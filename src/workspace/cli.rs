use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::GitConfig;
use crate::error::{AppError, Result};
use crate::workspace::{validate_branch_name, RemoteAccess, VersionControl};

/// Drives the external `git` executable.
///
/// The installation token is embedded in the clone URL and therefore ends up
/// in the checkout's `.git/config`.
pub struct GitCli {
    program: String,
    timeout: Duration,
    author_name: Option<String>,
    author_email: Option<String>,
}

impl GitCli {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: config.timeout(),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
        }
    }

    fn command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        if let Some(name) = &self.author_name {
            cmd.arg("-c").arg(format!("user.name={name}"));
        }
        if let Some(email) = &self.author_email {
            cmd.arg("-c").arg(format!("user.email={email}"));
        }
        // Fail on bad credentials instead of waiting for a prompt
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion. `Err` carries git's diagnostic text verbatim.
    async fn run(&self, mut cmd: Command) -> std::result::Result<String, String> {
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("Failed to execute {}: {e}", self.program)),
            Err(_) => {
                return Err(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            }
        };

        if !output.status.success() {
            // `git commit` reports "nothing to commit" on stdout
            let diagnostic = if output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                String::from_utf8_lossy(&output.stderr).into_owned()
            };
            return Err(diagnostic);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn clone_repo(&self, remote: &RemoteAccess, target: &Path) -> Result<()> {
        let mut cmd = self.command(None);
        cmd.arg("clone").arg(remote.authenticated_url()).arg(target);
        self.run(cmd).await.map_err(AppError::Checkout)?;
        Ok(())
    }

    async fn create_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        validate_branch_name(branch).map_err(AppError::BranchCreation)?;

        let mut cmd = self.command(Some(dir));
        cmd.args(["checkout", "-b", branch]);
        self.run(cmd).await.map_err(AppError::BranchCreation)?;
        Ok(())
    }

    async fn add_all(&self, dir: &Path) -> Result<()> {
        let mut cmd = self.command(Some(dir));
        cmd.args(["add", "."]);
        self.run(cmd).await.map_err(AppError::staging)?;
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        let mut cmd = self.command(Some(dir));
        cmd.args(["commit", "-m", message]);
        self.run(cmd).await.map_err(AppError::commit)?;
        Ok(())
    }

    async fn push(&self, dir: &Path, branch: &str, _remote: &RemoteAccess) -> Result<()> {
        validate_branch_name(branch).map_err(AppError::Push)?;

        let mut cmd = self.command(Some(dir));
        cmd.args(["push", "origin", branch]);
        self.run(cmd).await.map_err(AppError::Push)?;
        Ok(())
    }
}
