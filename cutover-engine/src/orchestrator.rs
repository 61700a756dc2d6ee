//! Pipeline orchestrator
//!
//! Sequences the stages of a validated pipeline strictly in declared order.
//! Each stage runs only after its predecessors succeeded; declared outputs
//! are checked against what the stage actually produced before advancing
//! (silent partial success becomes a contract violation); the first failure
//! halts the run. The run record is persisted before the result is returned.
//!
//! No orchestrator-level retry: re-invoking a stage is the executor's
//! business and must be idempotent from this level's perspective.

use crate::history::RunHistory;
use crate::stages::{StageContext, StageExecutor, StageOutputs};
use crate::store::ArtifactStore;
use anyhow::{Context, Result};
use cutover_core::config::PipelineConfig;
use cutover_core::domain::artifact::ArtifactRef;
use cutover_core::domain::pipeline::{Pipeline, StageKind};
use cutover_core::domain::run::{RunRecord, RunStatus, StageOutcome};
use cutover_core::error::StageError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Cooperative cancellation signal
///
/// Checked between stages only; once a stage has issued an external mutating
/// call it is allowed to complete, so the system is never left ambiguous.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation before the next stage starts
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives pipeline runs against a fixed set of stage executors
///
/// Independent runs may execute concurrently; the only mutable state they
/// share is the alias on the compute host, which the Deploy stage guards
/// with a compare-and-set write.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    store: Arc<dyn ArtifactStore>,
    source: Arc<dyn StageExecutor>,
    build: Arc<dyn StageExecutor>,
    deploy: Arc<dyn StageExecutor>,
    history: RunHistory,
    cancel: CancelHandle,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ArtifactStore>,
        source: Arc<dyn StageExecutor>,
        build: Arc<dyn StageExecutor>,
        deploy: Arc<dyn StageExecutor>,
        history: RunHistory,
    ) -> Self {
        Self {
            config,
            store,
            source,
            build,
            deploy,
            history,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle for cancelling runs between stages
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn executor_for(&self, kind: StageKind) -> &Arc<dyn StageExecutor> {
        match kind {
            StageKind::Source => &self.source,
            StageKind::Build => &self.build,
            StageKind::Deploy => &self.deploy,
        }
    }

    /// Executes the pipeline against one source ref
    ///
    /// Returns the persisted run record; stage failures are carried inside
    /// the record, an `Err` means the record itself could not be persisted.
    pub async fn run(&self, pipeline: &Pipeline, source_ref: &str) -> Result<RunRecord> {
        let mut record = RunRecord::begin(source_ref, &self.config.function_name);
        info!(
            "Starting run {} for {}/{} at '{}'",
            record.run_id, self.config.source_owner, self.config.source_repo, source_ref
        );

        let mut produced: HashMap<String, ArtifactRef> = HashMap::new();
        let total = pipeline.stages().len();

        for (idx, stage) in pipeline.stages().iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Run {} cancelled before stage '{}'",
                    record.run_id, stage.name
                );
                record.status = RunStatus::Cancelled {
                    before_stage: stage.name.clone(),
                };
                break;
            }

            info!(
                "Run {}: executing stage {}/{}: {}",
                record.run_id,
                idx + 1,
                total,
                stage.name
            );
            let started_at = chrono::Utc::now();

            let inputs = match self.wire_inputs(stage.name.as_str(), &stage.inputs, &produced) {
                Ok(inputs) => inputs,
                Err(err) => {
                    self.fail_stage(&mut record, &stage.name, started_at, err);
                    break;
                }
            };

            let ctx = StageContext {
                run_id: record.run_id,
                config: &self.config,
                source_ref,
                permissions: &stage.permissions,
                store: self.store.as_ref(),
            };

            let outputs = match self.executor_for(stage.kind).execute(&ctx, &inputs).await {
                Ok(outputs) => outputs,
                Err(err) => {
                    self.fail_stage(&mut record, &stage.name, started_at, err);
                    break;
                }
            };

            // Guard against silent partial success: every declared output
            // must actually exist, even though the executor reported Ok.
            if let Some(missing) = stage
                .outputs
                .iter()
                .find(|name| !outputs.artifacts.contains_key(*name))
            {
                let err = StageError::StageContractViolation {
                    stage: stage.name.clone(),
                    artifact: missing.clone(),
                };
                self.fail_stage(&mut record, &stage.name, started_at, err);
                break;
            }

            self.complete_stage(&mut record, &stage.name, started_at, outputs, &mut produced);
        }

        if record.status == RunStatus::InProgress {
            record.status = RunStatus::Succeeded;
            info!("Run {} succeeded", record.run_id);
        }
        record.finished_at = Some(chrono::Utc::now());

        self.history
            .append(&record)
            .await
            .context("failed to persist run record")?;

        Ok(record)
    }

    fn wire_inputs(
        &self,
        stage: &str,
        declared: &[String],
        produced: &HashMap<String, ArtifactRef>,
    ) -> Result<HashMap<String, ArtifactRef>, StageError> {
        let mut inputs = HashMap::new();
        for name in declared {
            let reference = produced.get(name).cloned().ok_or_else(|| {
                // Pipeline validation makes this unreachable for validated
                // definitions; it can only mean an upstream outcome was
                // recorded without its artifacts.
                StageError::StageContractViolation {
                    stage: stage.to_string(),
                    artifact: name.clone(),
                }
            })?;
            inputs.insert(name.clone(), reference);
        }
        Ok(inputs)
    }

    fn fail_stage(
        &self,
        record: &mut RunRecord,
        stage: &str,
        started_at: chrono::DateTime<chrono::Utc>,
        err: StageError,
    ) {
        error!("Run {}: stage '{}' failed: {}", record.run_id, stage, err);
        record.stages.push(StageOutcome::failed(stage, started_at, &err));
        record.status = RunStatus::Failed {
            stage: stage.to_string(),
        };
    }

    fn complete_stage(
        &self,
        record: &mut RunRecord,
        stage: &str,
        started_at: chrono::DateTime<chrono::Utc>,
        outputs: StageOutputs,
        produced: &mut HashMap<String, ArtifactRef>,
    ) {
        info!("Run {}: stage '{}' completed", record.run_id, stage);
        record.stages.push(StageOutcome::succeeded(
            stage,
            started_at,
            outputs.artifacts.values().cloned().collect(),
        ));
        if let Some(deploy) = outputs.deploy {
            info!(
                "Run {}: alias '{}' now at {}",
                record.run_id, deploy.alias, deploy.version
            );
            record.deployed = Some(deploy);
        }
        produced.extend(outputs.artifacts);
    }
}
