pub mod changes;
pub mod cli;
pub mod git;
pub mod manager;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::credentials::types::{embed_token, CredentialBundle};
use crate::error::Result;

pub use changes::{ChangeSet, FileChange};
pub use cli::GitCli;
pub use git::LibGit2;
pub use manager::{WorkingCheckout, WorkspaceManager};

/// Where a checkout comes from and the token that unlocks it.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteAccess {
    pub url: String,
    pub token: String,
}

impl RemoteAccess {
    pub fn from_bundle(bundle: &CredentialBundle) -> Self {
        Self {
            url: bundle.repository_url.clone(),
            token: bundle.installation_token.clone(),
        }
    }

    /// URL with `x-access-token:<token>@` in front of the host.
    pub fn authenticated_url(&self) -> String {
        embed_token(&self.url, &self.token)
    }
}

// Manual Debug impl to avoid leaking the installation token
impl fmt::Debug for RemoteAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAccess")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Version-control operations the pipeline drives inside a checkout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `remote` into `target`. Fails with `AppError::Checkout`.
    async fn clone_repo(&self, remote: &RemoteAccess, target: &Path) -> Result<()>;

    /// Create and switch to `branch`. Fails with `AppError::BranchCreation`.
    async fn create_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Stage everything in the working tree.
    async fn add_all(&self, dir: &Path) -> Result<()>;

    /// Record staged changes. Nothing staged is an error.
    async fn commit(&self, dir: &Path, message: &str) -> Result<()>;

    /// Push `branch` to `origin`. Fails with `AppError::Push`.
    async fn push(&self, dir: &Path, branch: &str, remote: &RemoteAccess) -> Result<()>;
}

/// Reject names that the git CLI would read as options.
pub(crate) fn validate_branch_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Branch name is empty".to_string());
    }
    if name.starts_with('-') {
        return Err(format!("Invalid branch name (starts with '-'): {name}"));
    }
    Ok(())
}
