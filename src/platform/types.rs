use serde::{Deserialize, Serialize};

/// Pull request to open: `head` into `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// The created pull request as reported by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestResult {
    pub html_url: String,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub id: Option<u64>,
}
