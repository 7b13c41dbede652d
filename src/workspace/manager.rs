use std::path::{Path, PathBuf};

use crate::config::WorkspaceConfig;
use crate::credentials::types::RepositoryIdentity;
use crate::error::{AppError, Result};
use crate::workspace::RemoteAccess;

/// Manages the directories checkouts are cloned into.
pub struct WorkspaceManager {
    base_dir: PathBuf,
    keep: bool,
}

/// A cloned repository tied to the credential it was cloned with.
#[derive(Debug, Clone)]
pub struct WorkingCheckout {
    pub path: PathBuf,
    pub remote: RemoteAccess,
}

impl WorkspaceManager {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            keep: config.keep,
        }
    }

    /// Directory for a run-owned checkout of `identity` on `branch`.
    pub fn ephemeral_path(&self, identity: &RepositoryIdentity, branch: &str) -> PathBuf {
        let safe_name = sanitize(&identity.to_string());
        let safe_branch = sanitize(branch);
        self.base_dir.join(format!("{safe_name}__{safe_branch}"))
    }

    /// Remove a stale ephemeral directory and ensure its parent exists.
    pub async fn prepare_ephemeral(&self, path: &Path) -> Result<()> {
        if path.exists() {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| AppError::Workspace(format!("Failed to clean workspace: {e}")))?;
        }
        Self::ensure_parent(path).await
    }

    /// Make sure a caller-chosen checkout path can be cloned into.
    pub async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Workspace(format!("Failed to create workspace dir: {e}")))?;
        }
        Ok(())
    }

    /// Delete an ephemeral checkout unless configured to keep it.
    ///
    /// Returns whether the directory was removed.
    pub async fn cleanup(&self, path: &Path) -> Result<bool> {
        if self.keep || !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| AppError::Workspace(format!("Failed to cleanup workspace: {e}")))?;
        Ok(true)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            '/' => '_',
            _ => '-',
        })
        .collect()
}
