//! External build command toolchain
//!
//! Runs a configured command in a scratch directory with the source archive
//! staged, and reads back the package it produces. The command's combined
//! stdout/stderr is captured as build diagnostics. The command receives:
//!
//! - `CUTOVER_SOURCE_ARCHIVE`: path to the staged source tarball
//! - `CUTOVER_PACKAGE_PATH`: path where it must write the packaged artifact

use crate::ports::{Toolchain, ToolchainError};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

pub struct CommandToolchain {
    program: String,
    args: Vec<String>,
}

impl CommandToolchain {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a command line on whitespace (no shell quoting)
    pub fn from_shell(command: &str) -> Result<Self, ToolchainError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ToolchainError::Other("empty build command".to_string()))?;
        Ok(Self::new(program, parts.map(String::from).collect()))
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    async fn build(&self, source_archive: &[u8]) -> Result<Vec<u8>, ToolchainError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| ToolchainError::Other(format!("scratch dir: {}", e)))?;
        let source_path = scratch.path().join("source.tar.gz");
        let package_path = scratch.path().join("package.zip");

        tokio::fs::write(&source_path, source_archive)
            .await
            .map_err(|e| ToolchainError::Other(format!("staging source archive: {}", e)))?;

        debug!(
            "Running build command '{}' in {}",
            self.program,
            scratch.path().display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(scratch.path())
            .env("CUTOVER_SOURCE_ARCHIVE", &source_path)
            .env("CUTOVER_PACKAGE_PATH", &package_path)
            .output()
            .await
            .map_err(|e| {
                ToolchainError::Other(format!("failed to run '{}': {}", self.program, e))
            })?;

        let diagnostics = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        if !output.status.success() {
            return Err(ToolchainError::Failed { diagnostics });
        }

        let package = tokio::fs::read(&package_path).await.map_err(|_| {
            ToolchainError::Failed {
                diagnostics: format!(
                    "build command succeeded but produced no package at {}\n{}",
                    package_path.display(),
                    diagnostics
                ),
            }
        })?;

        info!("Build command produced {} byte package", package.len());
        Ok(package)
    }
}
