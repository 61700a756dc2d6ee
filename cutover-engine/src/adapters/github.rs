//! GitHub source provider
//!
//! Fetches a tarball snapshot of a repository at a branch or commit from the
//! codeload endpoint, authenticating with a token resolved through the
//! credential vault under the `github-token` secret.

use crate::ports::{CredentialVault, SourceError, SourceProvider, SourceSnapshot, VaultError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Secret name (and JSON field) holding the GitHub OAuth token
pub const GITHUB_TOKEN_SECRET: &str = "github-token";

const DEFAULT_BASE_URL: &str = "https://codeload.github.com";

pub struct GithubSourceProvider {
    client: Client,
    vault: Arc<dyn CredentialVault>,
    base_url: String,
}

impl GithubSourceProvider {
    pub fn new(vault: Arc<dyn CredentialVault>) -> Self {
        Self {
            client: Client::new(),
            vault,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the codeload endpoint (for tests or mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SourceProvider for GithubSourceProvider {
    async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<SourceSnapshot, SourceError> {
        let token = self
            .vault
            .get_secret(GITHUB_TOKEN_SECRET, GITHUB_TOKEN_SECRET)
            .await
            .map_err(|e| match e {
                VaultError::NotFound { .. } => {
                    SourceError::AuthFailure("github token missing from vault".to_string())
                }
                VaultError::Other(detail) => SourceError::Other(detail),
            })?;

        let url = format!("{}/{}/{}/tar.gz/{}", self.base_url, owner, repo, reference);
        debug!("Fetching source tarball from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| SourceError::Other(format!("request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(SourceError::NotFound(format!(
                    "{}/{}@{}",
                    owner, repo, reference
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::AuthFailure(format!(
                    "github rejected the token for {}/{}",
                    owner, repo
                )));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Other(format!(
                    "unexpected status {}: {}",
                    status, body
                )));
            }
            _ => {}
        }

        let archive = response
            .bytes()
            .await
            .map_err(|e| SourceError::Other(format!("failed to read tarball body: {}", e)))?
            .to_vec();

        Ok(SourceSnapshot {
            revision: reference.to_string(),
            archive,
        })
    }
}
