use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which repository a credential is requested for.
///
/// Either mode may be left empty; the token service decides what is
/// acceptable. When both are set the numeric id wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIdentity {
    pub repository_id: Option<u64>,
    pub organization_name: Option<String>,
    pub repository_name: Option<String>,
}

impl RepositoryIdentity {
    pub fn by_id(repository_id: u64) -> Self {
        Self {
            repository_id: Some(repository_id),
            ..Self::default()
        }
    }

    pub fn by_name(organization_name: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            repository_id: None,
            organization_name: Some(organization_name.into()),
            repository_name: Some(repository_name.into()),
        }
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.repository_id, &self.organization_name, &self.repository_name) {
            (Some(id), _, _) => write!(f, "ID {id}"),
            (None, Some(org), Some(repo)) => write!(f, "{org}/{repo}"),
            (None, org, repo) => write!(
                f,
                "{}/{}",
                org.as_deref().unwrap_or("?"),
                repo.as_deref().unwrap_or("?")
            ),
        }
    }
}

/// Body of `POST /api/github/tokens`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum TokenRequest<'a> {
    #[serde(rename_all = "camelCase")]
    ById {
        repository_id: u64,
        internal_api_key: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    ByName {
        organization_name: Option<&'a str>,
        repository_name: Option<&'a str>,
        internal_api_key: &'a str,
    },
}

impl<'a> TokenRequest<'a> {
    pub(crate) fn new(identity: &'a RepositoryIdentity, internal_api_key: &'a str) -> Self {
        match identity.repository_id {
            Some(repository_id) => TokenRequest::ById {
                repository_id,
                internal_api_key,
            },
            None => TokenRequest::ByName {
                organization_name: identity.organization_name.as_deref(),
                repository_name: identity.repository_name.as_deref(),
                internal_api_key,
            },
        }
    }
}

/// Tokens and repository metadata issued by the token service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    pub github_app_token: String,
    pub installation_token: String,
    pub repository_url: String,
    pub repository_name: String,
    pub organization_name: String,
    pub expires_at: DateTime<Utc>,
}

// Manual Debug impl to avoid leaking the tokens
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("github_app_token", &"[REDACTED]")
            .field("installation_token", &"[REDACTED]")
            .field("repository_url", &self.repository_url)
            .field("repository_name", &self.repository_name)
            .field("organization_name", &self.organization_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CredentialBundle {
    /// `organization/repository` as resolved by the token service.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization_name, self.repository_name)
    }
}

/// Inline the token as `x-access-token` credentials. Non-HTTP URLs (local
/// paths, `file://`) carry no credentials and are returned unchanged.
pub(crate) fn embed_token(repository_url: &str, token: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = repository_url.strip_prefix(scheme) {
            return format!("{scheme}x-access-token:{token}@{rest}");
        }
    }
    repository_url.to_string()
}
