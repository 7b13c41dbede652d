use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use git2::{
    build::RepoBuilder, Cred, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks,
    Repository, Signature,
};

use crate::config::GitConfig;
use crate::error::{AppError, Result};
use crate::workspace::{validate_branch_name, RemoteAccess, VersionControl};

const DEFAULT_AUTHOR_NAME: &str = "repo-pilot";
const DEFAULT_AUTHOR_EMAIL: &str = "repo-pilot@users.noreply.github.com";

type GitResult = std::result::Result<(), git2::Error>;

/// In-process git through libgit2.
///
/// The remote URL stored in `.git/config` is the plain URL. The token is
/// only handed out through the credential callback.
pub struct LibGit2 {
    author_name: String,
    author_email: String,
    timeout: Duration,
}

impl LibGit2 {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            author_name: config
                .author_name
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
            author_email: config
                .author_email
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string()),
            timeout: config.timeout(),
        }
    }

    /// Run a libgit2 operation on the blocking pool, bounded by the git
    /// timeout. `Err` carries libgit2's message verbatim.
    ///
    /// The closure gets the deadline so network callbacks can cancel the
    /// transfer themselves; a stalled socket read still holds its thread
    /// until the connection drops.
    async fn blocking<F>(&self, task: &str, op: F) -> std::result::Result<(), String>
    where
        F: FnOnce(Instant) -> GitResult + Send + 'static,
    {
        let deadline = Instant::now() + self.timeout;
        let handle = tokio::task::spawn_blocking(move || op(deadline));

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result.map_err(|e| e.message().to_string()),
            Ok(Err(e)) => Err(format!("{task} task panicked: {e}")),
            Err(_) => Err(format!("{task} timed out after {}s", self.timeout.as_secs())),
        }
    }
}

/// Callbacks that offer the token once and give up past `deadline`. A second
/// credential request means the server rejected the token, and libgit2 would
/// otherwise keep asking.
fn make_callbacks(token: &str, deadline: Instant) -> RemoteCallbacks<'_> {
    let mut attempts = 0u32;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        attempts += 1;
        if attempts > 1 {
            return Err(git2::Error::from_str(
                "authentication failed: installation token rejected or expired",
            ));
        }
        Cred::userpass_plaintext("x-access-token", token)
    });
    // Returning false cancels the transfer
    callbacks.transfer_progress(move |_| Instant::now() < deadline);
    callbacks.sideband_progress(move |_| Instant::now() < deadline);
    callbacks
}

fn make_fetch_options(token: &str, deadline: Instant) -> FetchOptions<'_> {
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(make_callbacks(token, deadline));
    opts
}

/// Push options that turn a per-ref rejection into an error.
fn make_push_options(token: &str, deadline: Instant) -> PushOptions<'_> {
    let mut callbacks = make_callbacks(token, deadline);
    callbacks.push_update_reference(|refname, status| match status {
        Some(message) => Err(git2::Error::from_str(&format!(
            "remote rejected {refname}: {message}"
        ))),
        None => Ok(()),
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

fn switch_to(repo: &Repository, branch_name: &str) -> GitResult {
    let refname = format!("refs/heads/{branch_name}");
    let obj = repo.revparse_single(&refname)?;
    repo.checkout_tree(&obj, None)?;
    repo.set_head(&refname)
}

#[async_trait]
impl VersionControl for LibGit2 {
    async fn clone_repo(&self, remote: &RemoteAccess, target: &Path) -> Result<()> {
        let url = remote.url.clone();
        let token = remote.token.clone();
        let target = target.to_path_buf();

        self.blocking("Clone", move |deadline| {
            let mut builder = RepoBuilder::new();
            builder.fetch_options(make_fetch_options(&token, deadline));
            builder.clone(&url, &target)?;
            Ok(())
        })
        .await
        .map_err(AppError::Checkout)
    }

    async fn create_branch(&self, dir: &Path, branch_name: &str) -> Result<()> {
        validate_branch_name(branch_name).map_err(AppError::BranchCreation)?;

        let dir = dir.to_path_buf();
        let branch_name = branch_name.to_string();

        self.blocking("Create-branch", move |_| {
            let repo = Repository::open(&dir)?;
            let result = match repo.head() {
                Ok(head) => {
                    let commit = head.peel_to_commit()?;
                    repo.branch(&branch_name, &commit, false)?;
                    switch_to(&repo, &branch_name)
                }
                // Empty repository: the branch is born with the first commit
                Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                    repo.set_head(&format!("refs/heads/{branch_name}"))
                }
                Err(e) => Err(e),
            };
            result
        })
        .await
        .map_err(AppError::BranchCreation)
    }

    async fn add_all(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_path_buf();

        self.blocking("Add-all", move |_| {
            let repo = Repository::open(&dir)?;
            let mut index = repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            // Picks up deletions, which add_all leaves in the index
            index.update_all(["*"].iter(), None)?;
            index.write()
        })
        .await
        .map_err(AppError::staging)
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let message = message.to_string();
        let author_name = self.author_name.clone();
        let author_email = self.author_email.clone();

        self.blocking("Commit", move |_| {
            let repo = Repository::open(&dir)?;
            let sig = Signature::now(&author_name, &author_email)?;
            let mut index = repo.index()?;
            let tree_oid = index.write_tree()?;
            let tree = repo.find_tree(tree_oid)?;

            let parent = match repo.head() {
                Ok(head) => Some(head.peel_to_commit()?),
                Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
                Err(e) => return Err(e),
            };

            if let Some(parent) = &parent {
                if parent.tree_id() == tree_oid {
                    return Err(git2::Error::from_str("nothing to commit, working tree clean"));
                }
            }

            let parents: Vec<&git2::Commit> = parent.iter().collect();
            repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &parents)?;
            Ok(())
        })
        .await
        .map_err(AppError::commit)
    }

    async fn push(&self, dir: &Path, branch_name: &str, remote: &RemoteAccess) -> Result<()> {
        validate_branch_name(branch_name).map_err(AppError::Push)?;

        let dir = dir.to_path_buf();
        let branch_name = branch_name.to_string();
        let token = remote.token.clone();

        self.blocking("Push", move |deadline| {
            let repo = Repository::open(&dir)?;
            let mut origin = repo.find_remote("origin")?;
            let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
            let mut push_opts = make_push_options(&token, deadline);
            origin.push(&[&refspec], Some(&mut push_opts))?;
            Ok(())
        })
        .await
        .map_err(AppError::Push)
    }
}
