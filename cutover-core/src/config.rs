//! Pipeline configuration
//!
//! An explicit immutable configuration struct passed into the orchestrator at
//! construction. There is no ambient or global lookup; everything the
//! pipeline needs to know about its source and target function arrives here.

use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    #[error("stage_timeout must be greater than 0")]
    ZeroTimeout,
    #[error("environment variable {0} not set")]
    MissingEnv(&'static str),
}

/// Configuration for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Owner of the source repository (user or organization)
    pub source_owner: String,

    /// Name of the source repository
    pub source_repo: String,

    /// Branch to build when no explicit source ref is given
    pub branch: String,

    /// Name of the function on the compute host
    pub function_name: String,

    /// Traffic-facing alias to cut over on deploy
    pub alias_name: String,

    /// Bounded wait for each external call (provider fetch, toolchain,
    /// compute-host operations)
    pub stage_timeout: Duration,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for branch, alias and timeout
    pub fn new(
        source_owner: impl Into<String>,
        source_repo: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            source_owner: source_owner.into(),
            source_repo: source_repo.into(),
            branch: "main".to_string(),
            function_name: function_name.into(),
            alias_name: "live".to_string(),
            stage_timeout: Duration::from_secs(300),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SOURCE_OWNER (required)
    /// - SOURCE_REPO (required)
    /// - FUNCTION_NAME (required)
    /// - SOURCE_BRANCH (optional, default: "main")
    /// - ALIAS_NAME (optional, default: "live")
    /// - STAGE_TIMEOUT (optional, seconds, default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let source_owner =
            std::env::var("SOURCE_OWNER").map_err(|_| ConfigError::MissingEnv("SOURCE_OWNER"))?;
        let source_repo =
            std::env::var("SOURCE_REPO").map_err(|_| ConfigError::MissingEnv("SOURCE_REPO"))?;
        let function_name = std::env::var("FUNCTION_NAME")
            .map_err(|_| ConfigError::MissingEnv("FUNCTION_NAME"))?;

        let mut config = Self::new(source_owner, source_repo, function_name);

        if let Ok(branch) = std::env::var("SOURCE_BRANCH") {
            config.branch = branch;
        }
        if let Ok(alias) = std::env::var("ALIAS_NAME") {
            config.alias_name = alias;
        }
        if let Some(seconds) = std::env::var("STAGE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.stage_timeout = Duration::from_secs(seconds);
        }

        config.validate()?;
        Ok(config)
    }

    /// Overrides the branch to build
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Overrides the traffic-facing alias name
    pub fn with_alias_name(mut self, alias: impl Into<String>) -> Self {
        self.alias_name = alias.into();
        self
    }

    /// Overrides the per-call timeout
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_owner.is_empty() {
            return Err(ConfigError::EmptyField("source_owner"));
        }
        if self.source_repo.is_empty() {
            return Err(ConfigError::EmptyField("source_repo"));
        }
        if self.branch.is_empty() {
            return Err(ConfigError::EmptyField("branch"));
        }
        if self.function_name.is_empty() {
            return Err(ConfigError::EmptyField("function_name"));
        }
        if self.alias_name.is_empty() {
            return Err(ConfigError::EmptyField("alias_name"));
        }
        if self.stage_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        assert_eq!(config.branch, "main");
        assert_eq!(config.alias_name, "live");
        assert_eq!(config.stage_timeout, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::new("acme", "hello-lambda", "hello-fn")
            .with_branch("release")
            .with_alias_name("canary")
            .with_stage_timeout(Duration::from_secs(60));
        assert_eq!(config.branch, "release");
        assert_eq!(config.alias_name, "canary");
        assert_eq!(config.stage_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validation_rejects_empty_fields() {
        let mut config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        config.function_name = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyField("function_name"))
        );

        let mut config = PipelineConfig::new("acme", "hello-lambda", "hello-fn");
        config.stage_timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
