use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::ServiceConfig;
use crate::credentials::types::{CredentialBundle, RepositoryIdentity, TokenRequest};
use crate::credentials::CredentialSource;
use crate::error::{AppError, Result};

const TOKENS_PATH: &str = "/api/github/tokens";

/// Client for the internal token service.
pub struct TokenServiceClient {
    client: Client,
    endpoint: String,
    internal_api_key: String,
    timeout: Duration,
}

impl TokenServiceClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{TOKENS_PATH}", config.base_url.trim_end_matches('/')),
            internal_api_key: config.internal_api_key.clone(),
            timeout: config.timeout(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::CredentialTransport(format!(
                "token service timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            AppError::CredentialTransport(e.to_string())
        }
    }
}

#[async_trait]
impl CredentialSource for TokenServiceClient {
    async fn acquire(&self, identity: &RepositoryIdentity) -> Result<CredentialBundle> {
        tracing::debug!(repo = %identity, endpoint = %self.endpoint, "Requesting tokens");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&TokenRequest::new(identity, &self.internal_api_key))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status != StatusCode::OK {
            return Err(AppError::CredentialAcquisition {
                status: status.as_u16(),
                body,
            });
        }

        let bundle: CredentialBundle = serde_json::from_str(&body).map_err(|e| {
            AppError::CredentialTransport(format!("invalid token response: {e}: {body}"))
        })?;

        tracing::info!(
            repo = %bundle.full_name(),
            expires_at = %bundle.expires_at,
            "Acquired installation token"
        );

        Ok(bundle)
    }
}
