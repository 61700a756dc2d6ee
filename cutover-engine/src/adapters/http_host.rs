//! HTTP compute host adapter
//!
//! Talks to a compute host exposing function code, version, and alias
//! operations over HTTP. The alias write carries the expected prior version
//! in the request body; the host answers 409 when the expectation does not
//! hold, which maps to [`HostError::Conflict`].

use crate::ports::{ComputeHost, HostError};
use async_trait::async_trait;
use cutover_core::domain::release::VersionId;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub struct HttpComputeHost {
    client: Client,
    base_url: String,
}

impl HttpComputeHost {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn function_url(&self, function: &str, tail: &str) -> String {
        format!("{}/functions/{}/{}", self.base_url, function, tail)
    }
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: u64,
}

#[derive(Debug, Serialize)]
struct SetAliasRequest {
    version: u64,
    expected_prior: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ConflictResponse {
    #[serde(default)]
    found: Option<u64>,
}

#[async_trait]
impl ComputeHost for HttpComputeHost {
    async fn update_code(&self, function: &str, package: &[u8]) -> Result<(), HostError> {
        let response = self
            .client
            .put(self.function_url(function, "code"))
            .header("content-type", "application/zip")
            .body(package.to_vec())
            .send()
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(HostError::FunctionNotFound(function.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::PackageRejected(body))
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::Unavailable(format!("{}: {}", status, body)))
            }
            _ => Ok(()),
        }
    }

    async fn publish_version(&self, function: &str) -> Result<VersionId, HostError> {
        let response = self
            .client
            .post(self.function_url(function, "versions"))
            .send()
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(HostError::FunctionNotFound(function.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::PackageRejected(body))
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::Unavailable(format!("{}: {}", status, body)))
            }
            _ => {
                let parsed: VersionResponse = response
                    .json()
                    .await
                    .map_err(|e| HostError::Unavailable(format!("bad version response: {}", e)))?;
                Ok(VersionId(parsed.version))
            }
        }
    }

    async fn get_alias(
        &self,
        function: &str,
        alias: &str,
    ) -> Result<Option<VersionId>, HostError> {
        let response = self
            .client
            .get(self.function_url(function, &format!("aliases/{}", alias)))
            .send()
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::Unavailable(format!("{}: {}", status, body)))
            }
            _ => {
                let parsed: VersionResponse = response
                    .json()
                    .await
                    .map_err(|e| HostError::Unavailable(format!("bad alias response: {}", e)))?;
                Ok(Some(VersionId(parsed.version)))
            }
        }
    }

    async fn set_alias(
        &self,
        function: &str,
        alias: &str,
        version: VersionId,
        expected_prior: Option<VersionId>,
    ) -> Result<(), HostError> {
        let response = self
            .client
            .put(self.function_url(function, &format!("aliases/{}", alias)))
            .json(&SetAliasRequest {
                version: version.0,
                expected_prior: expected_prior.map(|v| v.0),
            })
            .send()
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::CONFLICT => {
                let found = response
                    .json::<ConflictResponse>()
                    .await
                    .ok()
                    .and_then(|c| c.found)
                    .map(VersionId);
                Err(HostError::Conflict {
                    expected: expected_prior,
                    found,
                })
            }
            StatusCode::NOT_FOUND => Err(HostError::FunctionNotFound(function.to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(HostError::Unavailable(format!("{}: {}", status, body)))
            }
            _ => Ok(()),
        }
    }
}
