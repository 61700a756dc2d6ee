//! Environment-variable credential vault
//!
//! Resolves `(name, field)` to an environment variable: the key is the name
//! (plus `_field` when it differs) uppercased with dashes mapped to
//! underscores, so `("github-token", "github-token")` reads `GITHUB_TOKEN`.

use crate::ports::{CredentialVault, SecretValue, VaultError};
use async_trait::async_trait;

#[derive(Default)]
pub struct EnvVault;

impl EnvVault {
    pub fn new() -> Self {
        Self
    }

    fn env_key(name: &str, field: &str) -> String {
        let key = if name == field {
            name.to_string()
        } else {
            format!("{}_{}", name, field)
        };
        key.to_uppercase().replace('-', "_")
    }
}

#[async_trait]
impl CredentialVault for EnvVault {
    async fn get_secret(&self, name: &str, field: &str) -> Result<SecretValue, VaultError> {
        let key = Self::env_key(name, field);
        std::env::var(&key)
            .map(SecretValue::new)
            .map_err(|_| VaultError::NotFound {
                name: name.to_string(),
                field: field.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(
            EnvVault::env_key("github-token", "github-token"),
            "GITHUB_TOKEN"
        );
        assert_eq!(EnvVault::env_key("deploy", "api-key"), "DEPLOY_API_KEY");
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let vault = EnvVault::new();
        let err = vault
            .get_secret("definitely-unset-secret", "field")
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound { .. }));
    }
}
