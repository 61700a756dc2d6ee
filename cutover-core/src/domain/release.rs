//! Versions and deploy results
//!
//! A version is an immutable published snapshot of function code on the
//! compute host; an alias is a mutable named pointer to exactly one version.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a published function version
///
/// Monotonically increasing per function. Once published, the code behind a
/// version is frozen; the same identifier never means different code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub u64);

impl VersionId {
    /// The first version a function can be published as
    pub const FIRST: VersionId = VersionId(1);

    /// Returns the next version identifier in sequence
    pub fn next(self) -> VersionId {
        VersionId(self.0 + 1)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Outcome of a successful Deploy stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResult {
    /// The newly published version now backing the alias
    pub version: VersionId,
    /// The alias that was repointed (or created on first deploy)
    pub alias: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(VersionId(3) < VersionId(4));
        assert_eq!(VersionId::FIRST.next(), VersionId(2));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(VersionId(7).to_string(), "v7");
    }
}
