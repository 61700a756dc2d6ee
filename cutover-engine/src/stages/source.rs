//! Source stage
//!
//! Fetches a snapshot of the configured repository at the run's source ref
//! and records it as the `source` artifact. Takes no artifact inputs.

use crate::ports::{SourceError, SourceProvider};
use crate::stages::{StageContext, StageExecutor, StageOutputs, bounded};
use async_trait::async_trait;
use cutover_core::domain::artifact::{ArtifactRef, SOURCE_ARTIFACT};
use cutover_core::error::StageError;
use cutover_core::permissions::Permission;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct SourceStage {
    provider: Arc<dyn SourceProvider>,
}

impl SourceStage {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl StageExecutor for SourceStage {
    async fn execute(
        &self,
        ctx: &StageContext<'_>,
        _inputs: &HashMap<String, ArtifactRef>,
    ) -> Result<StageOutputs, StageError> {
        ctx.require("Source", Permission::ReadSource)?;
        // The provider may resolve credentials through the vault on our
        // behalf, so the grant must cover secret reads as well.
        ctx.require("Source", Permission::ReadSecrets)?;

        let config = ctx.config;
        info!(
            "Fetching {}/{} at '{}'",
            config.source_owner, config.source_repo, ctx.source_ref
        );

        let snapshot = bounded(
            "source.fetch",
            config.stage_timeout,
            self.provider
                .fetch(&config.source_owner, &config.source_repo, ctx.source_ref),
        )
        .await?
        .map_err(|e| match e {
            SourceError::NotFound(detail) => StageError::SourceFetchFailed {
                reason: format!("not found: {}", detail),
            },
            SourceError::AuthFailure(detail) => StageError::SourceFetchFailed {
                reason: format!("authentication failed: {}", detail),
            },
            SourceError::Other(detail) => StageError::SourceFetchFailed { reason: detail },
        })?;

        info!(
            "Fetched snapshot at revision '{}' ({} bytes)",
            snapshot.revision,
            snapshot.archive.len()
        );

        let reference = ctx
            .store
            .put(ctx.run_id, SOURCE_ARTIFACT, snapshot.archive)
            .await
            .map_err(|e| StageError::Internal(e.to_string()))?;

        Ok(StageOutputs::artifact(reference))
    }
}
