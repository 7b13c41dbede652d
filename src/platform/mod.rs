pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::credentials::types::CredentialBundle;
use crate::error::Result;
use types::*;

pub use github::GitHubRestClient;

/// Upstream hosting service the finished branch is proposed to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Open a pull request on the repository the bundle was issued for.
    async fn create_pull_request(
        &self,
        credential: &CredentialBundle,
        pr: &PullRequestRequest,
    ) -> Result<PullRequestResult>;
}
