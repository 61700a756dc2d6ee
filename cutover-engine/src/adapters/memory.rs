//! In-memory collaborators
//!
//! Full-fidelity in-process implementations of the ports: the compute host
//! keeps monotonic versions with frozen code and compare-and-set alias
//! writes, so the whole engine can run and be tested without any external
//! service.

use crate::ports::{
    ComputeHost, CredentialVault, HostError, SecretValue, SourceError, SourceProvider,
    SourceSnapshot, Toolchain, ToolchainError, VaultError,
};
use async_trait::async_trait;
use cutover_core::domain::release::VersionId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct FunctionState {
    /// Code staged by update_code, not yet published
    staged_code: Option<Vec<u8>>,
    /// Published versions; code is frozen once inserted
    versions: BTreeMap<VersionId, Vec<u8>>,
    aliases: HashMap<String, VersionId>,
    next_version: u64,
}

/// In-process compute host
#[derive(Default)]
pub struct MemoryComputeHost {
    functions: Mutex<HashMap<String, FunctionState>>,
    reject_update: Mutex<Option<String>>,
}

impl MemoryComputeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `update_code` call fail as a rejected package
    pub fn reject_next_update(&self, reason: &str) {
        *self.reject_update.lock().unwrap() = Some(reason.to_string());
    }

    /// Test inspection: the frozen code behind a published version
    pub fn version_code(&self, function: &str, version: VersionId) -> Option<Vec<u8>> {
        self.functions
            .lock()
            .unwrap()
            .get(function)
            .and_then(|f| f.versions.get(&version).cloned())
    }

    /// Test inspection: where an alias currently points
    pub fn alias_target(&self, function: &str, alias: &str) -> Option<VersionId> {
        self.functions
            .lock()
            .unwrap()
            .get(function)
            .and_then(|f| f.aliases.get(alias).copied())
    }

    /// Test inspection: how many versions have been published
    pub fn version_count(&self, function: &str) -> usize {
        self.functions
            .lock()
            .unwrap()
            .get(function)
            .map(|f| f.versions.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ComputeHost for MemoryComputeHost {
    async fn update_code(&self, function: &str, package: &[u8]) -> Result<(), HostError> {
        if let Some(reason) = self.reject_update.lock().unwrap().take() {
            return Err(HostError::PackageRejected(reason));
        }
        if package.is_empty() {
            return Err(HostError::PackageRejected("empty package".to_string()));
        }

        let mut functions = self.functions.lock().unwrap();
        functions.entry(function.to_string()).or_default().staged_code = Some(package.to_vec());
        Ok(())
    }

    async fn publish_version(&self, function: &str) -> Result<VersionId, HostError> {
        let mut functions = self.functions.lock().unwrap();
        let state = functions
            .get_mut(function)
            .ok_or_else(|| HostError::FunctionNotFound(function.to_string()))?;

        let code = state
            .staged_code
            .clone()
            .ok_or_else(|| HostError::PackageRejected("no code update staged".to_string()))?;

        state.next_version += 1;
        let version = VersionId(state.next_version);
        state.versions.insert(version, code);
        Ok(version)
    }

    async fn get_alias(
        &self,
        function: &str,
        alias: &str,
    ) -> Result<Option<VersionId>, HostError> {
        let functions = self.functions.lock().unwrap();
        Ok(functions
            .get(function)
            .and_then(|f| f.aliases.get(alias).copied()))
    }

    async fn set_alias(
        &self,
        function: &str,
        alias: &str,
        version: VersionId,
        expected_prior: Option<VersionId>,
    ) -> Result<(), HostError> {
        let mut functions = self.functions.lock().unwrap();
        let state = functions
            .get_mut(function)
            .ok_or_else(|| HostError::FunctionNotFound(function.to_string()))?;

        if !state.versions.contains_key(&version) {
            return Err(HostError::UnknownVersion(version));
        }

        let current = state.aliases.get(alias).copied();
        if current != expected_prior {
            return Err(HostError::Conflict {
                expected: expected_prior,
                found: current,
            });
        }

        state.aliases.insert(alias.to_string(), version);
        Ok(())
    }
}

/// Source provider that serves one fixed archive for any request
pub struct StaticSourceProvider {
    archive: Vec<u8>,
}

impl StaticSourceProvider {
    pub fn new(archive: Vec<u8>) -> Self {
        Self { archive }
    }
}

#[async_trait]
impl SourceProvider for StaticSourceProvider {
    async fn fetch(
        &self,
        _owner: &str,
        _repo: &str,
        reference: &str,
    ) -> Result<SourceSnapshot, SourceError> {
        Ok(SourceSnapshot {
            revision: reference.to_string(),
            archive: self.archive.clone(),
        })
    }
}

/// Vault backed by an in-memory map
#[derive(Default)]
pub struct StaticVault {
    secrets: HashMap<(String, String), String>,
}

impl StaticVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(
        mut self,
        name: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.secrets.insert((name.into(), field.into()), value.into());
        self
    }
}

#[async_trait]
impl CredentialVault for StaticVault {
    async fn get_secret(&self, name: &str, field: &str) -> Result<SecretValue, VaultError> {
        self.secrets
            .get(&(name.to_string(), field.to_string()))
            .map(|v| SecretValue::new(v.clone()))
            .ok_or_else(|| VaultError::NotFound {
                name: name.to_string(),
                field: field.to_string(),
            })
    }
}

/// Deterministic toolchain for tests and dry runs
pub enum FixtureToolchain {
    /// Produces `package_for(source)`
    Succeeding,
    /// Fails with the given diagnostics
    Failing { diagnostics: String },
    /// Produces an empty package
    Empty,
}

impl FixtureToolchain {
    pub fn succeeding() -> Self {
        Self::Succeeding
    }

    pub fn failing(diagnostics: impl Into<String>) -> Self {
        Self::Failing {
            diagnostics: diagnostics.into(),
        }
    }

    pub fn empty() -> Self {
        Self::Empty
    }

    /// The package the succeeding variant derives from a source archive
    pub fn package_for(source: &[u8]) -> Vec<u8> {
        [b"pkg:".as_slice(), source].concat()
    }
}

#[async_trait]
impl Toolchain for FixtureToolchain {
    async fn build(&self, source_archive: &[u8]) -> Result<Vec<u8>, ToolchainError> {
        match self {
            FixtureToolchain::Succeeding => Ok(Self::package_for(source_archive)),
            FixtureToolchain::Failing { diagnostics } => Err(ToolchainError::Failed {
                diagnostics: diagnostics.clone(),
            }),
            FixtureToolchain::Empty => Ok(Vec::new()),
        }
    }
}
