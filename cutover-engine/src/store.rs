//! Artifact store
//!
//! Content-addressed handoff point between stages within one run. Content
//! written under a ref is never mutated: a second put under the same run and
//! name is rejected, and reads verify the stored bytes still match the ref's
//! digest. This is not a general-purpose object store; entries live for the
//! run's retention window only.

use async_trait::async_trait;
use cutover_core::domain::artifact::ArtifactRef;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Artifact store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Artifacts are write-once; the producer tried to overwrite one
    #[error("artifact '{name}' already written for run {run_id}")]
    AlreadyExists { run_id: Uuid, name: String },
    #[error("artifact not found: {0}")]
    NotFound(ArtifactRef),
    #[error("artifact store I/O: {0}")]
    Io(String),
}

/// Hex-encoded sha256 digest of a byte payload
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Handoff store between stages of a run
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Records an artifact and returns its content-addressed reference
    async fn put(&self, run_id: Uuid, name: &str, bytes: Vec<u8>) -> Result<ArtifactRef, StoreError>;

    /// Returns the exact bytes originally written under the reference
    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StoreError>;
}

/// In-process artifact store
///
/// Keyed by (run id, artifact name) so concurrent runs never observe each
/// other's artifacts.
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<(Uuid, String), Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, run_id: Uuid, name: &str, bytes: Vec<u8>) -> Result<ArtifactRef, StoreError> {
        let digest = content_digest(&bytes);
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let key = (run_id, name.to_string());
        if entries.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                run_id,
                name: name.to_string(),
            });
        }

        debug!("Recorded artifact {}/{} ({} bytes)", run_id, name, bytes.len());
        entries.insert(key, bytes);

        Ok(ArtifactRef {
            run_id,
            name: name.to_string(),
            digest,
        })
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let key = (reference.run_id, reference.name.clone());
        let bytes = entries
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(reference.clone()))?;

        // A ref with a different digest names a different artifact, even if
        // the (run, name) slot is occupied.
        if content_digest(bytes) != reference.digest {
            return Err(StoreError::NotFound(reference.clone()));
        }

        Ok(bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_returns_original_bytes() {
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();

        let reference = store.put(run_id, "source", b"tarball".to_vec()).await.unwrap();
        assert_eq!(reference.name, "source");
        assert_eq!(reference.digest, content_digest(b"tarball"));

        let bytes = store.get(&reference).await.unwrap();
        assert_eq!(bytes, b"tarball");
    }

    #[tokio::test]
    async fn test_artifacts_are_write_once() {
        let store = MemoryArtifactStore::new();
        let run_id = Uuid::new_v4();

        store.put(run_id, "package", b"v1".to_vec()).await.unwrap();
        let err = store.put(run_id, "package", b"v2".to_vec()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_runs_do_not_share_artifacts() {
        let store = MemoryArtifactStore::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();

        let ref_a = store.put(run_a, "package", b"a".to_vec()).await.unwrap();

        // Same name under another run resolves independently.
        store.put(run_b, "package", b"b".to_vec()).await.unwrap();
        assert_eq!(store.get(&ref_a).await.unwrap(), b"a");

        // A ref forged for run_b with run_a's digest does not resolve.
        let forged = ArtifactRef {
            run_id: run_b,
            name: "package".to_string(),
            digest: ref_a.digest.clone(),
        };
        assert!(matches!(
            store.get(&forged).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_ref_is_not_found() {
        let store = MemoryArtifactStore::new();
        let reference = ArtifactRef {
            run_id: Uuid::new_v4(),
            name: "source".to_string(),
            digest: content_digest(b"missing"),
        };
        assert!(matches!(
            store.get(&reference).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
