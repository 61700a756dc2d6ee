//! Ports to the external collaborators
//!
//! The engine never talks to source control, secret storage, the compute
//! host, or the build toolchain directly; it goes through these traits.
//! Concrete adapters live in [`crate::adapters`], and the test suite drives
//! the engine entirely through in-memory implementations.

use async_trait::async_trait;
use cutover_core::domain::release::VersionId;
use std::fmt;
use thiserror::Error;

/// A versioned snapshot of a repository state
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    /// The git reference the snapshot was resolved from
    pub revision: String,
    /// Archived repository content (tarball bytes)
    pub archive: Vec<u8>,
}

/// A secret value resolved from the credential vault
///
/// Debug output never shows the value.
#[derive(Clone)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

/// Source provider failures
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("authentication failed: {0}")]
    AuthFailure(String),
    #[error("source provider error: {0}")]
    Other(String),
}

/// Credential vault failures
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("secret '{name}' field '{field}' not found")]
    NotFound { name: String, field: String },
    #[error("vault error: {0}")]
    Other(String),
}

/// Compute host failures
#[derive(Debug, Error)]
pub enum HostError {
    #[error("function '{0}' not found")]
    FunctionNotFound(String),
    /// The host rejected the uploaded package (e.g., malformed archive)
    #[error("package rejected: {0}")]
    PackageRejected(String),
    /// Compare-and-set alias write lost against a concurrent modification
    #[error("alias conflict: expected {expected:?}, found {found:?}")]
    Conflict {
        expected: Option<VersionId>,
        found: Option<VersionId>,
    },
    #[error("version {0} is not published")]
    UnknownVersion(VersionId),
    #[error("compute host unavailable: {0}")]
    Unavailable(String),
}

/// Toolchain failures
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The build itself failed; diagnostics are the captured toolchain output
    #[error("build failed:\n{diagnostics}")]
    Failed { diagnostics: String },
    /// The toolchain could not be invoked at all
    #[error("toolchain error: {0}")]
    Other(String),
}

/// Yields a versioned snapshot of a repository state
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetches a snapshot of `{owner}/{repo}` at the given git reference
    async fn fetch(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<SourceSnapshot, SourceError>;
}

/// Yields secret values by name and field
#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn get_secret(&self, name: &str, field: &str) -> Result<SecretValue, VaultError>;
}

/// The compute runtime that hosts the deployed function
///
/// `set_alias` has compare-and-set semantics: the write succeeds only if the
/// alias currently resolves to `expected_prior` (`None` meaning the alias
/// does not exist and is created by this write). A mismatch is a
/// [`HostError::Conflict`] and leaves the alias untouched.
#[async_trait]
pub trait ComputeHost: Send + Sync {
    /// Replaces the code of the unaliased function resource
    async fn update_code(&self, function: &str, package: &[u8]) -> Result<(), HostError>;

    /// Publishes an immutable version from the staged code update
    async fn publish_version(&self, function: &str) -> Result<VersionId, HostError>;

    /// Resolves the alias to its current version, if the alias exists
    async fn get_alias(&self, function: &str, alias: &str)
    -> Result<Option<VersionId>, HostError>;

    /// Atomically points the alias at `version`, conditioned on `expected_prior`
    async fn set_alias(
        &self,
        function: &str,
        alias: &str,
        version: VersionId,
        expected_prior: Option<VersionId>,
    ) -> Result<(), HostError>;
}

/// The external build toolchain, treated as a black box
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Turns a source archive into a packaged artifact or fails with
    /// captured diagnostics
    async fn build(&self, source_archive: &[u8]) -> Result<Vec<u8>, ToolchainError>;
}
