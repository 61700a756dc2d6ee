//! Deploy stage
//!
//! Performs the atomic cutover protocol:
//! 1. Push the package as a code update on the unaliased function resource.
//! 2. Publish an immutable version; rejection fails the stage here, before
//!    any alias is touched, so the live version keeps serving traffic.
//! 3. Single compare-and-set alias write against the version observed at the
//!    start of this stage. A concurrent-deploy conflict is surfaced to the
//!    operator, never auto-retried.
//!
//! Emits no artifact; its effect is the alias repoint plus a `DeployResult`.

use crate::alias::AliasManager;
use crate::ports::{ComputeHost, HostError};
use crate::stages::{StageContext, StageExecutor, StageOutputs, bounded};
use async_trait::async_trait;
use cutover_core::domain::artifact::{ArtifactRef, PACKAGE_ARTIFACT};
use cutover_core::domain::release::DeployResult;
use cutover_core::error::StageError;
use cutover_core::permissions::Permission;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct DeployStage {
    host: Arc<dyn ComputeHost>,
}

impl DeployStage {
    pub fn new(host: Arc<dyn ComputeHost>) -> Self {
        Self { host }
    }
}

fn host_failure(alias: &str, err: HostError) -> StageError {
    match err {
        HostError::PackageRejected(reason) => StageError::PackageInvalid { reason },
        HostError::Conflict { expected, found } => StageError::AliasConflict {
            alias: alias.to_string(),
            expected,
            found,
        },
        other => StageError::Internal(other.to_string()),
    }
}

#[async_trait]
impl StageExecutor for DeployStage {
    async fn execute(
        &self,
        ctx: &StageContext<'_>,
        inputs: &HashMap<String, ArtifactRef>,
    ) -> Result<StageOutputs, StageError> {
        ctx.require("Deploy", Permission::UpdateFunctionCode)?;
        ctx.require("Deploy", Permission::PublishVersion)?;
        ctx.require("Deploy", Permission::UpdateAlias)?;
        ctx.require("Deploy", Permission::CreateAlias)?;

        let config = ctx.config;
        let function = config.function_name.as_str();
        let alias = config.alias_name.as_str();
        let timeout = config.stage_timeout;

        let package_ref = ctx.input(inputs, PACKAGE_ARTIFACT)?;
        let package = ctx
            .store
            .get(package_ref)
            .await
            .map_err(|e| StageError::Internal(e.to_string()))?;

        let manager = AliasManager::new(self.host.clone(), function, alias);

        // Observation point for the compare-and-set: whatever the alias
        // resolves to now is what the switch will be conditioned on.
        let observed_prior = bounded("host.get_alias", timeout, manager.current())
            .await?
            .map_err(|e| host_failure(alias, e))?;

        info!(
            "Deploying {} to '{}' (alias '{}' currently {:?})",
            package_ref, function, alias, observed_prior
        );

        bounded(
            "host.update_code",
            timeout,
            self.host.update_code(function, &package),
        )
        .await?
        .map_err(|e| host_failure(alias, e))?;

        let version = bounded(
            "host.publish_version",
            timeout,
            self.host.publish_version(function),
        )
        .await?
        .map_err(|e| host_failure(alias, e))?;

        info!("Published '{}' {}", function, version);

        bounded(
            "host.set_alias",
            timeout,
            manager.cutover(observed_prior, version),
        )
        .await?
        .map_err(|e| host_failure(alias, e))?;

        Ok(StageOutputs::deployed(DeployResult {
            version,
            alias: alias.to_string(),
        }))
    }
}
