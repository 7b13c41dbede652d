use std::path::Path;

use crate::config::{AppConfig, GitBackend};
use crate::credentials::types::{CredentialBundle, RepositoryIdentity};
use crate::credentials::{CredentialSource, TokenServiceClient};
use crate::error::Result;
use crate::platform::types::{PullRequestRequest, PullRequestResult};
use crate::platform::{GitHubRestClient, PullRequestApi};
use crate::workflow::types::{AutomationPlan, RunReport};
use crate::workspace::{
    changes, ChangeSet, GitCli, LibGit2, RemoteAccess, VersionControl, WorkingCheckout,
    WorkspaceManager,
};

/// Drives acquire → clone → branch → edit → commit → push → open PR.
///
/// Every stage is awaited before the next one starts and any error aborts
/// the run. Nothing is rolled back.
pub struct RepositoryAutomationClient {
    credentials: Box<dyn CredentialSource>,
    vcs: Box<dyn VersionControl>,
    pulls: Box<dyn PullRequestApi>,
    workspace: WorkspaceManager,
}

impl RepositoryAutomationClient {
    pub fn new(
        credentials: Box<dyn CredentialSource>,
        vcs: Box<dyn VersionControl>,
        pulls: Box<dyn PullRequestApi>,
        workspace: WorkspaceManager,
    ) -> Self {
        Self {
            credentials,
            vcs,
            pulls,
            workspace,
        }
    }

    /// Build the real clients from a validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let vcs: Box<dyn VersionControl> = match config.git.backend {
            GitBackend::Cli => Box::new(GitCli::new(&config.git)),
            GitBackend::Libgit2 => Box::new(LibGit2::new(&config.git)),
        };

        Ok(Self::new(
            Box::new(TokenServiceClient::new(&config.service)?),
            vcs,
            Box::new(GitHubRestClient::new(&config.github)?),
            WorkspaceManager::new(&config.workspace),
        ))
    }

    pub async fn acquire_credential(&self, identity: &RepositoryIdentity) -> Result<CredentialBundle> {
        tracing::info!(stage = "acquire", repo = %identity, "Requesting credential");
        self.credentials.acquire(identity).await
    }

    /// Acquire a credential and clone the repository into `local_path`.
    ///
    /// With the CLI backend the token stays in the checkout's remote URL, so
    /// the directory must be treated as sensitive.
    pub async fn clone_repository(
        &self,
        identity: &RepositoryIdentity,
        local_path: &Path,
    ) -> Result<(CredentialBundle, WorkingCheckout)> {
        self.clone_into(identity, local_path, false).await
    }

    async fn clone_into(
        &self,
        identity: &RepositoryIdentity,
        path: &Path,
        ephemeral: bool,
    ) -> Result<(CredentialBundle, WorkingCheckout)> {
        let bundle = self.acquire_credential(identity).await?;

        if ephemeral {
            self.workspace.prepare_ephemeral(path).await?;
        } else {
            WorkspaceManager::ensure_parent(path).await?;
        }

        let remote = RemoteAccess::from_bundle(&bundle);
        tracing::info!(
            stage = "clone",
            repo = %bundle.full_name(),
            path = %path.display(),
            "Cloning repository"
        );
        self.vcs.clone_repo(&remote, path).await?;

        let checkout = WorkingCheckout {
            path: path.to_path_buf(),
            remote,
        };
        Ok((bundle, checkout))
    }

    pub async fn create_branch(&self, checkout: &WorkingCheckout, branch: &str) -> Result<()> {
        tracing::info!(stage = "branch", branch = branch, "Creating branch");
        self.vcs.create_branch(&checkout.path, branch).await
    }

    pub async fn apply_changes(&self, checkout: &WorkingCheckout, change_set: &ChangeSet) -> Result<()> {
        tracing::info!(stage = "edit", files = change_set.len(), "Applying changes");
        changes::apply(&checkout.path, change_set).await
    }

    /// Stage the whole working tree, then commit it.
    pub async fn commit(&self, checkout: &WorkingCheckout, message: &str) -> Result<()> {
        tracing::info!(stage = "commit", message = message, "Committing changes");
        self.vcs.add_all(&checkout.path).await?;
        self.vcs.commit(&checkout.path, message).await
    }

    pub async fn push(&self, checkout: &WorkingCheckout, branch: &str) -> Result<()> {
        tracing::info!(stage = "push", branch = branch, "Pushing branch");
        self.vcs.push(&checkout.path, branch, &checkout.remote).await
    }

    /// Open a pull request with a freshly acquired credential.
    pub async fn open_pull_request(
        &self,
        identity: &RepositoryIdentity,
        request: &PullRequestRequest,
    ) -> Result<PullRequestResult> {
        let bundle = self.acquire_credential(identity).await?;
        tracing::info!(
            stage = "publish",
            repo = %bundle.full_name(),
            head = %request.head,
            base = %request.base,
            "Opening pull request"
        );
        self.pulls.create_pull_request(&bundle, request).await
    }

    /// Run the whole pipeline for one plan.
    ///
    /// A run-owned checkout is removed afterwards whether or not the run
    /// succeeded.
    pub async fn run(&self, plan: &AutomationPlan) -> Result<RunReport> {
        let (path, ephemeral) = match &plan.checkout_path {
            Some(path) => (path.clone(), false),
            None => (self.workspace.ephemeral_path(&plan.identity, &plan.branch), true),
        };

        let result = self.run_stages(plan, &path, ephemeral).await;

        let mut retained = path.exists();
        if ephemeral {
            match self.workspace.cleanup(&path).await {
                Ok(removed) => retained &= !removed,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove checkout"),
            }
        }

        let (bundle, pull_request) = match result {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(stage = e.stage(), error = %e, "Automation run aborted");
                return Err(e);
            }
        };

        Ok(RunReport {
            repository: bundle.full_name(),
            expires_at: bundle.expires_at,
            branch: plan.branch.clone(),
            checkout: path,
            checkout_retained: retained,
            pull_request,
        })
    }

    async fn run_stages(
        &self,
        plan: &AutomationPlan,
        path: &Path,
        ephemeral: bool,
    ) -> Result<(CredentialBundle, PullRequestResult)> {
        let (bundle, checkout) = self.clone_into(&plan.identity, path, ephemeral).await?;
        tracing::info!(
            repo = %bundle.full_name(),
            expires_at = %bundle.expires_at,
            "Cloned repository"
        );

        self.create_branch(&checkout, &plan.branch).await?;
        self.apply_changes(&checkout, &plan.changes).await?;
        self.commit(&checkout, &plan.commit_message).await?;
        self.push(&checkout, &plan.branch).await?;

        let request = PullRequestRequest {
            title: plan.title.clone(),
            head: plan.branch.clone(),
            base: plan.base.clone(),
            body: plan.body.clone(),
        };
        let pull_request = self.open_pull_request(&plan.identity, &request).await?;

        Ok((bundle, pull_request))
    }
}
