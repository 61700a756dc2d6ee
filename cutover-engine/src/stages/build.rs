//! Build stage
//!
//! Hands the `source` artifact to the external toolchain and records the
//! packaged result as the `package` artifact. A failed toolchain invocation
//! surfaces as `BuildFailed` with the captured diagnostics, never silently.

use crate::ports::{Toolchain, ToolchainError};
use crate::stages::{StageContext, StageExecutor, StageOutputs, bounded};
use async_trait::async_trait;
use cutover_core::domain::artifact::{ArtifactRef, PACKAGE_ARTIFACT, SOURCE_ARTIFACT};
use cutover_core::error::StageError;
use cutover_core::permissions::Permission;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct BuildStage {
    toolchain: Arc<dyn Toolchain>,
}

impl BuildStage {
    pub fn new(toolchain: Arc<dyn Toolchain>) -> Self {
        Self { toolchain }
    }
}

#[async_trait]
impl StageExecutor for BuildStage {
    async fn execute(
        &self,
        ctx: &StageContext<'_>,
        inputs: &HashMap<String, ArtifactRef>,
    ) -> Result<StageOutputs, StageError> {
        ctx.require("Build", Permission::RunToolchain)?;

        let source_ref = ctx.input(inputs, SOURCE_ARTIFACT)?;
        let source = ctx
            .store
            .get(source_ref)
            .await
            .map_err(|e| StageError::Internal(e.to_string()))?;

        info!("Building {} ({} bytes of source)", source_ref, source.len());

        let package = bounded(
            "toolchain.build",
            ctx.config.stage_timeout,
            self.toolchain.build(&source),
        )
        .await?
        .map_err(|e| match e {
            ToolchainError::Failed { diagnostics } => StageError::BuildFailed { diagnostics },
            ToolchainError::Other(detail) => StageError::Internal(detail),
        })?;

        if package.is_empty() {
            return Err(StageError::PackageInvalid {
                reason: "toolchain produced an empty package".to_string(),
            });
        }

        info!("Build produced {} byte package", package.len());

        let reference = ctx
            .store
            .put(ctx.run_id, PACKAGE_ARTIFACT, package)
            .await
            .map_err(|e| StageError::Internal(e.to_string()))?;

        Ok(StageOutputs::artifact(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::FixtureToolchain;
    use crate::store::{ArtifactStore, MemoryArtifactStore};
    use cutover_core::config::PipelineConfig;
    use cutover_core::domain::pipeline::StageKind;
    use cutover_core::permissions::scope_for;
    use std::time::Duration;
    use uuid::Uuid;

    struct SleepyToolchain;

    #[async_trait]
    impl Toolchain for SleepyToolchain {
        async fn build(&self, _source_archive: &[u8]) -> Result<Vec<u8>, ToolchainError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(b"late".to_vec())
        }
    }

    async fn seeded_ctx_inputs(
        store: &MemoryArtifactStore,
        run_id: Uuid,
    ) -> HashMap<String, ArtifactRef> {
        let reference = store
            .put(run_id, SOURCE_ARTIFACT, b"source-tarball".to_vec())
            .await
            .unwrap();
        HashMap::from([(SOURCE_ARTIFACT.to_string(), reference)])
    }

    #[tokio::test]
    async fn test_build_stage_records_package() {
        let stage = BuildStage::new(Arc::new(FixtureToolchain::succeeding()));
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();
        let inputs = seeded_ctx_inputs(&store, run_id).await;
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        let permissions = scope_for(StageKind::Build);
        let ctx = StageContext {
            run_id,
            config: &config,
            source_ref: "main",
            permissions: &permissions,
            store: &store,
        };

        let outputs = stage.execute(&ctx, &inputs).await.unwrap();
        let reference = outputs.artifacts.get(PACKAGE_ARTIFACT).unwrap();
        let package = store.get(reference).await.unwrap();
        assert_eq!(package, FixtureToolchain::package_for(b"source-tarball"));
    }

    #[tokio::test]
    async fn test_toolchain_failure_surfaces_diagnostics() {
        let stage = BuildStage::new(Arc::new(FixtureToolchain::failing(
            "main.go:7: undefined: Handler",
        )));
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();
        let inputs = seeded_ctx_inputs(&store, run_id).await;
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        let permissions = scope_for(StageKind::Build);
        let ctx = StageContext {
            run_id,
            config: &config,
            source_ref: "main",
            permissions: &permissions,
            store: &store,
        };

        let err = stage.execute(&ctx, &inputs).await.unwrap_err();
        match err {
            StageError::BuildFailed { diagnostics } => {
                assert!(diagnostics.contains("undefined: Handler"));
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_toolchain_times_out() {
        let stage = BuildStage::new(Arc::new(SleepyToolchain));
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();
        let inputs = seeded_ctx_inputs(&store, run_id).await;
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn")
            .with_stage_timeout(Duration::from_millis(20));
        let permissions = scope_for(StageKind::Build);
        let ctx = StageContext {
            run_id,
            config: &config,
            source_ref: "main",
            permissions: &permissions,
            store: &store,
        };

        let err = stage.execute(&ctx, &inputs).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_empty_package_is_invalid() {
        let stage = BuildStage::new(Arc::new(FixtureToolchain::empty()));
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();
        let inputs = seeded_ctx_inputs(&store, run_id).await;
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        let permissions = scope_for(StageKind::Build);
        let ctx = StageContext {
            run_id,
            config: &config,
            source_ref: "main",
            permissions: &permissions,
            store: &store,
        };

        let err = stage.execute(&ctx, &inputs).await.unwrap_err();
        assert_eq!(err.kind(), "package_invalid");
    }
}
