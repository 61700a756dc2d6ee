//! Pipeline run records
//!
//! One record per end-to-end pipeline execution. The orchestrator owns the
//! record while the run is in progress and persists it to run history before
//! returning, so every run is auditable: stage outcomes, artifact references,
//! timestamps, and the deployed version on success.

use crate::domain::artifact::ArtifactRef;
use crate::domain::release::DeployResult;
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one stage within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    Failed,
}

/// Record of a single executed stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: String,
    pub status: StageStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// References to the artifacts this stage recorded in the store
    pub outputs: Vec<ArtifactRef>,
    /// Stable error kind (e.g., "build_failed") when the stage failed
    pub error_kind: Option<String>,
    /// Human-readable error detail, including captured build diagnostics
    pub error: Option<String>,
}

impl StageOutcome {
    /// Builds a successful outcome
    pub fn succeeded(
        stage: impl Into<String>,
        started_at: chrono::DateTime<chrono::Utc>,
        outputs: Vec<ArtifactRef>,
    ) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Succeeded,
            started_at,
            finished_at: chrono::Utc::now(),
            outputs,
            error_kind: None,
            error: None,
        }
    }

    /// Builds a failed outcome from a stage error
    pub fn failed(
        stage: impl Into<String>,
        started_at: chrono::DateTime<chrono::Utc>,
        error: &StageError,
    ) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Failed,
            started_at,
            finished_at: chrono::Utc::now(),
            outputs: Vec::new(),
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
        }
    }
}

/// Final status of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    InProgress,
    Succeeded,
    /// Run halted at the named stage; later stages were not attempted
    Failed {
        stage: String,
    },
    /// Cancellation observed before the named stage started
    Cancelled {
        before_stage: String,
    },
}

/// Persisted record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// Git reference (branch or commit) the run built
    pub source_ref: String,
    pub function_name: String,
    pub status: RunStatus,
    pub stages: Vec<StageOutcome>,
    /// Set only when the Deploy stage completed its cutover
    pub deployed: Option<DeployResult>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl RunRecord {
    /// Creates an in-progress record at run start
    pub fn begin(
        source_ref: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source_ref: source_ref.into(),
            function_name: function_name.into(),
            status: RunStatus::InProgress,
            stages: Vec::new(),
            deployed: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the run completed all stages
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// The stage the run failed at, if any
    pub fn failed_stage(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Failed { stage } => Some(stage),
            _ => None,
        }
    }

    /// Every artifact reference recorded across all stages
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.stages.iter().flat_map(|s| s.outputs.iter())
    }
}
