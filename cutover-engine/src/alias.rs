//! Alias manager
//!
//! Owns the alias→version pointer for one function/alias pair. The pointer
//! update is a single compare-and-set write against the version observed at
//! the start of Deploy, so two concurrent deploys can never overwrite each
//! other: exactly one wins, the other gets a conflict and the alias keeps
//! resolving to whatever it resolved to before.

use crate::ports::{ComputeHost, HostError};
use cutover_core::domain::release::VersionId;
use std::sync::Arc;
use tracing::info;

/// Maintains the traffic-facing alias for one function
pub struct AliasManager {
    host: Arc<dyn ComputeHost>,
    function: String,
    alias: String,
}

impl AliasManager {
    pub fn new(
        host: Arc<dyn ComputeHost>,
        function: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            host,
            function: function.into(),
            alias: alias.into(),
        }
    }

    /// The version the alias currently resolves to, if the alias exists
    pub async fn current(&self) -> Result<Option<VersionId>, HostError> {
        self.host.get_alias(&self.function, &self.alias).await
    }

    /// Atomically repoints the alias to `new_version`
    ///
    /// `observed_prior` is the version the alias resolved to at the start of
    /// the Deploy stage. The write succeeds only if that is still the current
    /// version; otherwise the host reports a conflict and the alias is left
    /// untouched.
    ///
    /// First-ever deploy: when no prior version was observed, create and
    /// update share this code path, gated on an alias-existence check
    /// immediately before the write.
    pub async fn cutover(
        &self,
        observed_prior: Option<VersionId>,
        new_version: VersionId,
    ) -> Result<(), HostError> {
        if observed_prior.is_none() {
            if let Some(found) = self.current().await? {
                return Err(HostError::Conflict {
                    expected: None,
                    found: Some(found),
                });
            }
        }

        self.host
            .set_alias(&self.function, &self.alias, new_version, observed_prior)
            .await?;

        match observed_prior {
            Some(prior) => info!(
                "Alias '{}' on '{}' cut over {} -> {}",
                self.alias, self.function, prior, new_version
            ),
            None => info!(
                "Alias '{}' on '{}' created at {}",
                self.alias, self.function, new_version
            ),
        }

        Ok(())
    }
}
