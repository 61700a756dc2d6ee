//! Pipeline and stage definitions
//!
//! A pipeline is an ordered sequence of stages, constructed once and immutable
//! thereafter. Stage wiring is explicit: every stage declares the artifacts it
//! consumes and produces by name, and the declarations are validated at
//! construction so that each input matches an output of a strictly earlier
//! stage. There is no implicit ordering and no forward references.

use crate::domain::artifact::{PACKAGE_ARTIFACT, SOURCE_ARTIFACT};
use crate::error::PipelineDefinitionError;
use crate::permissions::{PermissionSet, scope_for};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The kind of work a stage performs
///
/// Dispatch on this variant is exhaustive in the engine; adding a kind is a
/// compile-time event everywhere a stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Fetch a versioned snapshot from the source provider
    Source,
    /// Turn source into a packaged artifact via the external toolchain
    Build,
    /// Publish a version and atomically repoint the alias
    Deploy,
}

/// One discrete step of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
    /// Artifact names this stage consumes, produced by earlier stages
    pub inputs: Vec<String>,
    /// Artifact names this stage must produce on success
    pub outputs: Vec<String>,
    /// Least-privilege grant for this stage, derived from its kind
    pub permissions: PermissionSet,
}

impl Stage {
    /// Creates a stage with the minimum permission set for its kind
    pub fn new(
        name: impl Into<String>,
        kind: StageKind,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            outputs,
            permissions: scope_for(kind),
        }
    }
}

/// Validated, immutable ordered sequence of stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Validates stage wiring and permissions and builds the pipeline
    ///
    /// Rejects: empty pipelines, duplicate stage names, inputs not produced
    /// by a strictly earlier stage, two producers for one artifact, and any
    /// non-Deploy stage holding a compute-host mutation permission.
    pub fn new(stages: Vec<Stage>) -> Result<Self, PipelineDefinitionError> {
        if stages.is_empty() {
            return Err(PipelineDefinitionError::Empty);
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut produced: HashMap<&str, &str> = HashMap::new();

        for stage in &stages {
            if !names.insert(stage.name.as_str()) {
                return Err(PipelineDefinitionError::DuplicateStageName(
                    stage.name.clone(),
                ));
            }

            // Inputs must already have a producer; iteration order makes
            // forward references and cycles impossible to satisfy.
            for input in &stage.inputs {
                if !produced.contains_key(input.as_str()) {
                    return Err(PipelineDefinitionError::UnboundInput {
                        stage: stage.name.clone(),
                        input: input.clone(),
                    });
                }
            }

            for output in &stage.outputs {
                if let Some(first) = produced.insert(output.as_str(), stage.name.as_str()) {
                    return Err(PipelineDefinitionError::DuplicateProducer {
                        artifact: output.clone(),
                        first: first.to_string(),
                        second: stage.name.clone(),
                    });
                }
            }

            if stage.kind != StageKind::Deploy {
                if let Some(permission) =
                    stage.permissions.iter().find(|p| p.mutates_host())
                {
                    return Err(PipelineDefinitionError::ExcessPermissions {
                        stage: stage.name.clone(),
                        kind: stage.kind,
                        permission,
                    });
                }
            }
        }

        Ok(Self { stages })
    }

    /// The canonical Source → Build → Deploy pipeline
    ///
    /// Deploy declares the package as its only input; repo-level side inputs
    /// are a wiring change here if a deploy step ever needs them.
    pub fn standard() -> Self {
        let stages = vec![
            Stage::new(
                "Source",
                StageKind::Source,
                vec![],
                vec![SOURCE_ARTIFACT.to_string()],
            ),
            Stage::new(
                "Build",
                StageKind::Build,
                vec![SOURCE_ARTIFACT.to_string()],
                vec![PACKAGE_ARTIFACT.to_string()],
            ),
            Stage::new(
                "Deploy",
                StageKind::Deploy,
                vec![PACKAGE_ARTIFACT.to_string()],
                vec![],
            ),
        ];

        // The canonical wiring is valid by construction.
        Self::new(stages).expect("standard pipeline definition is valid")
    }

    /// The stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    #[test]
    fn test_standard_pipeline_shape() {
        let pipeline = Pipeline::standard();
        let stages = pipeline.stages();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].kind, StageKind::Source);
        assert_eq!(stages[1].kind, StageKind::Build);
        assert_eq!(stages[2].kind, StageKind::Deploy);
        assert_eq!(stages[1].inputs, vec![SOURCE_ARTIFACT.to_string()]);
        assert_eq!(stages[2].inputs, vec![PACKAGE_ARTIFACT.to_string()]);
        assert!(stages[2].outputs.is_empty());
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert_eq!(Pipeline::new(vec![]), Err(PipelineDefinitionError::Empty));
    }

    #[test]
    fn test_forward_reference_rejected() {
        // Build consumes "source" before any stage produces it.
        let stages = vec![
            Stage::new(
                "Build",
                StageKind::Build,
                vec!["source".to_string()],
                vec!["package".to_string()],
            ),
            Stage::new("Source", StageKind::Source, vec![], vec!["source".to_string()]),
        ];
        assert_eq!(
            Pipeline::new(stages),
            Err(PipelineDefinitionError::UnboundInput {
                stage: "Build".to_string(),
                input: "source".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_producer_rejected() {
        let stages = vec![
            Stage::new("A", StageKind::Source, vec![], vec!["source".to_string()]),
            Stage::new("B", StageKind::Source, vec![], vec!["source".to_string()]),
        ];
        assert!(matches!(
            Pipeline::new(stages),
            Err(PipelineDefinitionError::DuplicateProducer { .. })
        ));
    }

    #[test]
    fn test_duplicate_stage_name_rejected() {
        let stages = vec![
            Stage::new("Source", StageKind::Source, vec![], vec!["a".to_string()]),
            Stage::new("Source", StageKind::Source, vec![], vec!["b".to_string()]),
        ];
        assert_eq!(
            Pipeline::new(stages),
            Err(PipelineDefinitionError::DuplicateStageName(
                "Source".to_string()
            ))
        );
    }

    #[test]
    fn test_mutation_permission_outside_deploy_rejected() {
        let mut build = Stage::new(
            "Build",
            StageKind::Build,
            vec!["source".to_string()],
            vec!["package".to_string()],
        );
        // Hand-grant a Deploy-only permission to a Build stage.
        build.permissions = [Permission::RunToolchain, Permission::UpdateAlias]
            .into_iter()
            .collect();

        let stages = vec![
            Stage::new("Source", StageKind::Source, vec![], vec!["source".to_string()]),
            build,
        ];
        assert_eq!(
            Pipeline::new(stages),
            Err(PipelineDefinitionError::ExcessPermissions {
                stage: "Build".to_string(),
                kind: StageKind::Build,
                permission: Permission::UpdateAlias,
            })
        );
    }
}
