//! Artifact identity types
//!
//! Artifacts are the handoff points between stages. A stage never receives
//! raw bytes directly from its predecessor; it receives an [`ArtifactRef`]
//! and resolves it through the artifact store of the current run.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of the artifact emitted by the Source stage
pub const SOURCE_ARTIFACT: &str = "source";

/// Name of the artifact emitted by the Build stage
pub const PACKAGE_ARTIFACT: &str = "package";

/// Reference to an immutable artifact produced during a pipeline run
///
/// An artifact is identified by the run that produced it, its declared name,
/// and the sha256 digest of its content. A consumer always resolves the exact
/// artifact its declared producer wrote in the same run; there is no "latest"
/// lookup across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// The pipeline run that produced this artifact
    pub run_id: Uuid,
    /// Declared artifact name (e.g., "source", "package")
    pub name: String,
    /// Hex-encoded sha256 digest of the content
    pub digest: String,
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = if self.digest.len() > 12 {
            &self.digest[..12]
        } else {
            &self.digest
        };
        write!(f, "{}/{}@{}", self.run_id, self.name, short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shortens_digest() {
        let run_id = Uuid::new_v4();
        let r = ArtifactRef {
            run_id,
            name: "package".to_string(),
            digest: "abcdef0123456789abcdef0123456789".to_string(),
        };
        assert_eq!(r.to_string(), format!("{}/package@abcdef012345", run_id));
    }
}
