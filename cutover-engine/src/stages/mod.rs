//! Stage executors
//!
//! One executor per [`StageKind`]. An executor receives its declared inputs
//! as artifact references, does its work against the external collaborators,
//! and returns the artifacts it produced (or a typed failure). Every external
//! call is wrapped in a bounded wait; on timeout the stage fails and the
//! orchestrator halts the run.

pub mod build;
pub mod deploy;
pub mod source;

pub use build::BuildStage;
pub use deploy::DeployStage;
pub use source::SourceStage;

use crate::store::ArtifactStore;
use async_trait::async_trait;
use cutover_core::config::PipelineConfig;
use cutover_core::domain::artifact::ArtifactRef;
use cutover_core::domain::release::DeployResult;
use cutover_core::error::StageError;
use cutover_core::permissions::{Permission, PermissionSet};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Everything a stage needs from the run that invokes it
pub struct StageContext<'a> {
    pub run_id: Uuid,
    pub config: &'a PipelineConfig,
    /// Git reference (branch or commit) this run builds
    pub source_ref: &'a str,
    /// The permission set granted to this stage
    pub permissions: &'a PermissionSet,
    pub store: &'a dyn ArtifactStore,
}

impl StageContext<'_> {
    /// Fails with `PermissionDenied` unless the grant covers `permission`
    pub fn require(&self, stage: &str, permission: Permission) -> Result<(), StageError> {
        if self.permissions.contains(permission) {
            Ok(())
        } else {
            Err(StageError::PermissionDenied {
                stage: stage.to_string(),
                permission,
            })
        }
    }

    /// Resolves a declared input artifact reference by name
    ///
    /// The orchestrator wires inputs from validated declarations, so a miss
    /// here is an internal fault, not a user error.
    pub fn input<'m>(
        &self,
        inputs: &'m HashMap<String, ArtifactRef>,
        name: &str,
    ) -> Result<&'m ArtifactRef, StageError> {
        inputs
            .get(name)
            .ok_or_else(|| StageError::Internal(format!("input artifact '{}' not wired", name)))
    }
}

/// What a stage hands back to the orchestrator
#[derive(Debug, Default)]
pub struct StageOutputs {
    /// Produced artifacts by declared name
    pub artifacts: HashMap<String, ArtifactRef>,
    /// Set by the Deploy stage after a completed cutover
    pub deploy: Option<DeployResult>,
}

impl StageOutputs {
    /// No artifacts, no deploy
    pub fn none() -> Self {
        Self::default()
    }

    /// A single produced artifact
    pub fn artifact(reference: ArtifactRef) -> Self {
        let mut artifacts = HashMap::new();
        artifacts.insert(reference.name.clone(), reference);
        Self {
            artifacts,
            deploy: None,
        }
    }

    /// A completed deploy (no artifact output)
    pub fn deployed(result: DeployResult) -> Self {
        Self {
            artifacts: HashMap::new(),
            deploy: Some(result),
        }
    }
}

/// Runs one stage's work against its inputs
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: &StageContext<'_>,
        inputs: &HashMap<String, ArtifactRef>,
    ) -> Result<StageOutputs, StageError>;
}

/// Bounds an external call; elapsing the limit is a stage failure
pub(crate) async fn bounded<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = T>,
) -> Result<T, StageError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StageError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArtifactStore;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded("fast", Duration::from_secs(1), async { 42 })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            StageError::Timeout { operation, .. } if operation == "slow"
        ));
    }

    #[tokio::test]
    async fn test_require_checks_grant() {
        let config = PipelineConfig::new("acme", "repo", "fn");
        let store = MemoryArtifactStore::new();
        let permissions: PermissionSet = [Permission::ReadSource].into_iter().collect();
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            config: &config,
            source_ref: "main",
            permissions: &permissions,
            store: &store,
        };

        assert!(ctx.require("Source", Permission::ReadSource).is_ok());
        let err = ctx.require("Source", Permission::UpdateAlias).unwrap_err();
        assert!(matches!(err, StageError::PermissionDenied { .. }));
    }
}
