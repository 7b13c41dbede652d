pub mod service;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

pub use service::TokenServiceClient;

/// Resolves a repository identity to a scoped credential bundle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Issue exactly one request for a credential. No retries.
    async fn acquire(&self, identity: &RepositoryIdentity) -> Result<CredentialBundle>;
}
