//! Permission scoping
//!
//! Each stage runs under a least-privilege permission set derived from its
//! kind. The scope is a deterministic, pure function of stage identity so it
//! can be tested without provisioning anything. Source and Build never hold
//! compute-host mutation permissions; only Deploy does. A violation is a
//! pipeline-definition error caught at construction, not a runtime error.

use crate::domain::pipeline::StageKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single grantable capability
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Permission {
    /// Fetch a repository snapshot from the source provider
    ReadSource,
    /// Read a secret from the credential vault
    ReadSecrets,
    /// Invoke the external build toolchain
    RunToolchain,
    /// Replace the code of the unaliased function resource
    UpdateFunctionCode,
    /// Publish an immutable version from the current function code
    PublishVersion,
    /// Repoint an existing alias to another version
    UpdateAlias,
    /// Create an alias that does not exist yet
    CreateAlias,
}

impl Permission {
    /// Whether this permission allows mutating state on the compute host
    pub fn mutates_host(self) -> bool {
        matches!(
            self,
            Permission::UpdateFunctionCode
                | Permission::PublishVersion
                | Permission::UpdateAlias
                | Permission::CreateAlias
        )
    }
}

/// An ordered set of permissions granted to a stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty permission set
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Checks whether the set grants a permission
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Checks whether every permission in this set is also in `other`
    pub fn is_subset_of(&self, other: &PermissionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Iterates the granted permissions in stable order
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Number of granted permissions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no permissions are granted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|p| format!("{:?}", p)).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Returns the minimum permission set for a stage of the given kind
///
/// Pure function of stage identity; the same kind always maps to the same
/// scope.
pub fn scope_for(kind: StageKind) -> PermissionSet {
    match kind {
        StageKind::Source => [Permission::ReadSource, Permission::ReadSecrets]
            .into_iter()
            .collect(),
        StageKind::Build => [Permission::RunToolchain].into_iter().collect(),
        StageKind::Deploy => [
            Permission::UpdateFunctionCode,
            Permission::PublishVersion,
            Permission::UpdateAlias,
            Permission::CreateAlias,
        ]
        .into_iter()
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_is_deterministic() {
        assert_eq!(scope_for(StageKind::Deploy), scope_for(StageKind::Deploy));
        assert_eq!(scope_for(StageKind::Source), scope_for(StageKind::Source));
    }

    #[test]
    fn test_only_deploy_mutates_host() {
        for kind in [StageKind::Source, StageKind::Build] {
            assert!(
                scope_for(kind).iter().all(|p| !p.mutates_host()),
                "{:?} must not hold host-mutation permissions",
                kind
            );
        }
        assert!(scope_for(StageKind::Deploy).iter().all(|p| p.mutates_host()));
    }

    #[test]
    fn test_deploy_scope_contents() {
        let scope = scope_for(StageKind::Deploy);
        assert!(scope.contains(Permission::UpdateFunctionCode));
        assert!(scope.contains(Permission::PublishVersion));
        assert!(scope.contains(Permission::UpdateAlias));
        assert!(scope.contains(Permission::CreateAlias));
        assert_eq!(scope.len(), 4);
    }

    #[test]
    fn test_subset_check() {
        let build = scope_for(StageKind::Build);
        let deploy = scope_for(StageKind::Deploy);
        assert!(PermissionSet::empty().is_subset_of(&build));
        assert!(!deploy.is_subset_of(&build));
    }
}
