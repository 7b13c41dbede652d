use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::credentials::types::RepositoryIdentity;
use crate::platform::types::PullRequestResult;
use crate::workspace::ChangeSet;

/// Everything one automation run needs.
#[derive(Debug, Clone)]
pub struct AutomationPlan {
    pub identity: RepositoryIdentity,
    pub branch: String,
    pub base: String,
    pub title: String,
    pub body: String,
    pub commit_message: String,
    pub changes: ChangeSet,
    /// Clone here and leave it in place. `None` uses a run-owned directory.
    pub checkout_path: Option<PathBuf>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `organization/repository` as resolved by the token service.
    pub repository: String,
    pub expires_at: DateTime<Utc>,
    pub branch: String,
    pub checkout: PathBuf,
    /// Whether the checkout was still on disk when the run ended.
    pub checkout_retained: bool,
    pub pull_request: PullRequestResult,
}
