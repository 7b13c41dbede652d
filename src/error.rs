use std::fmt;

use thiserror::Error;

/// Which half of a commit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    /// `git add` of the whole working tree.
    Staging,
    /// Recording the commit itself.
    Record,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStep::Staging => f.write_str("staging"),
            CommitStep::Record => f.write_str("commit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to get tokens ({status}): {body}")]
    CredentialAcquisition { status: u16, body: String },

    /// The token service gave no usable answer (timeout, connection, body).
    #[error("Failed to get tokens: {0}")]
    CredentialTransport(String),

    #[error("Git clone failed: {0}")]
    Checkout(String),

    #[error("Failed to create branch: {0}")]
    BranchCreation(String),

    #[error("Failed to commit ({step}): {detail}")]
    Commit { step: CommitStep, detail: String },

    #[error("Failed to push branch: {0}")]
    Push(String),

    #[error("Failed to create PR ({status}): {body}")]
    PullRequestCreation { status: u16, body: String },

    #[error("Failed to create PR: {0}")]
    PullRequestTransport(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn staging(detail: impl Into<String>) -> Self {
        AppError::Commit {
            step: CommitStep::Staging,
            detail: detail.into(),
        }
    }

    pub fn commit(detail: impl Into<String>) -> Self {
        AppError::Commit {
            step: CommitStep::Record,
            detail: detail.into(),
        }
    }

    /// Short name of the pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::CredentialAcquisition { .. } | AppError::CredentialTransport(_) => "acquire",
            AppError::Checkout(_) => "clone",
            AppError::BranchCreation(_) => "branch",
            AppError::Workspace(_) | AppError::Io(_) => "edit",
            AppError::Commit { .. } => "commit",
            AppError::Push(_) => "push",
            AppError::PullRequestCreation { .. } | AppError::PullRequestTransport(_) => "publish",
            AppError::Http(_) => "transport",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
