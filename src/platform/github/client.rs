use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::GitHubConfig;
use crate::credentials::types::CredentialBundle;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::PullRequestApi;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST client authenticated with the bundle's app token.
pub struct GitHubRestClient {
    client: Client,
    api_url: String,
    timeout: Duration,
}

impl GitHubRestClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::PullRequestTransport(format!(
                "GitHub API timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            AppError::PullRequestTransport(e.to_string())
        }
    }

    fn pulls_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }
}

#[async_trait]
impl PullRequestApi for GitHubRestClient {
    async fn create_pull_request(
        &self,
        credential: &CredentialBundle,
        pr: &PullRequestRequest,
    ) -> Result<PullRequestResult> {
        let url = self.pulls_url(&credential.organization_name, &credential.repository_name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&credential.github_app_token)
            .header("accept", ACCEPT)
            .header("x-github-api-version", API_VERSION)
            .json(pr)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status != StatusCode::CREATED {
            return Err(AppError::PullRequestCreation {
                status: status.as_u16(),
                body,
            });
        }

        let created: PullRequestResult = serde_json::from_str(&body).map_err(|e| {
            AppError::PullRequestTransport(format!("invalid pull request response: {e}: {body}"))
        })?;
        tracing::info!(url = %created.html_url, number = ?created.number, "Created PR");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulls_url_encodes_segments() {
        let config = GitHubConfig {
            api_url: "https://ghe.example.com/api/v3/".to_string(),
            ..GitHubConfig::default()
        };
        let client = GitHubRestClient::new(&config).unwrap();
        assert_eq!(
            client.pulls_url("myorg", "my repo"),
            "https://ghe.example.com/api/v3/repos/myorg/my%20repo/pulls"
        );
    }

    #[tokio::test]
    async fn test_timeout_is_a_pull_request_error() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = GitHubRestClient::new(&GitHubConfig {
            api_url: format!("http://{addr}"),
            timeout_secs: 1,
            ..GitHubConfig::default()
        })
        .unwrap();
        let credential: CredentialBundle = serde_json::from_value(serde_json::json!({
            "githubAppToken": "app-token",
            "installationToken": "install-token",
            "repositoryUrl": "https://github.com/myorg/myrepo",
            "repositoryName": "myrepo",
            "organizationName": "myorg",
            "expiresAt": "2026-10-16T13:00:00Z"
        }))
        .unwrap();
        let pr = PullRequestRequest {
            title: "T".to_string(),
            head: "feature".to_string(),
            base: "main".to_string(),
            body: String::new(),
        };

        let err = client.create_pull_request(&credential, &pr).await.unwrap_err();

        assert_eq!(err.stage(), "publish");
        match err {
            AppError::PullRequestTransport(detail) => {
                assert!(detail.contains("timed out after 1s"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
