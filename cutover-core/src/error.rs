//! Error taxonomy for the cutover system
//!
//! Stage failures are typed results, never uncaught faults. The orchestrator
//! surfaces the first failing stage with full context and halts; later stages
//! are not attempted.

use crate::domain::pipeline::StageKind;
use crate::domain::release::VersionId;
use crate::permissions::Permission;
use thiserror::Error;

/// Failure of a single stage execution
#[derive(Debug, Error)]
pub enum StageError {
    /// The source provider could not deliver a snapshot
    #[error("source fetch failed: {reason}")]
    SourceFetchFailed { reason: String },

    /// The build toolchain reported failure; diagnostics are captured verbatim
    #[error("build failed:\n{diagnostics}")]
    BuildFailed { diagnostics: String },

    /// The compute host rejected the packaged artifact
    #[error("package invalid: {reason}")]
    PackageInvalid { reason: String },

    /// A concurrent deploy moved the alias between observation and switch
    #[error("alias '{alias}' conflict: expected {expected:?}, found {found:?}")]
    AliasConflict {
        alias: String,
        expected: Option<VersionId>,
        found: Option<VersionId>,
    },

    /// An external call exceeded its bounded wait
    #[error("operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// A stage reported success but a declared output artifact is missing
    #[error("stage '{stage}' declared output '{artifact}' but did not produce it")]
    StageContractViolation { stage: String, artifact: String },

    /// A stage attempted an action outside its granted permission set
    #[error("stage '{stage}' lacks permission {permission:?}")]
    PermissionDenied {
        stage: String,
        permission: Permission,
    },

    /// Infrastructure fault (artifact store, host transport) outside the
    /// domain taxonomy
    #[error("internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// Stable machine-readable kind, used in persisted run records
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::SourceFetchFailed { .. } => "source_fetch_failed",
            StageError::BuildFailed { .. } => "build_failed",
            StageError::PackageInvalid { .. } => "package_invalid",
            StageError::AliasConflict { .. } => "alias_conflict",
            StageError::Timeout { .. } => "timeout",
            StageError::StageContractViolation { .. } => "stage_contract_violation",
            StageError::PermissionDenied { .. } => "permission_denied",
            StageError::Internal(_) => "internal",
        }
    }

    /// Whether this failure was a concurrent-deploy conflict
    ///
    /// Conflicts are surfaced to the operator rather than auto-retried; a
    /// blind retry could race with an intentional concurrent rollback.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StageError::AliasConflict { .. })
    }
}

/// Invalid pipeline definition, detected at construction time
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineDefinitionError {
    /// Pipeline has no stages at all
    #[error("pipeline has no stages")]
    Empty,

    /// Two stages share a name
    #[error("duplicate stage name '{0}'")]
    DuplicateStageName(String),

    /// A stage consumes an artifact no earlier stage produces
    #[error("stage '{stage}' input '{input}' is not produced by any earlier stage")]
    UnboundInput { stage: String, input: String },

    /// Two stages declare the same output artifact
    #[error("artifact '{artifact}' is declared as output by both '{first}' and '{second}'")]
    DuplicateProducer {
        artifact: String,
        first: String,
        second: String,
    },

    /// A non-Deploy stage holds a compute-host mutation permission
    #[error("stage '{stage}' ({kind:?}) holds host-mutation permission {permission:?}")]
    ExcessPermissions {
        stage: String,
        kind: StageKind,
        permission: Permission,
    },
}
