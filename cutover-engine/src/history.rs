//! Run history
//!
//! Append-only NDJSON file, one run record per line, flushed per write and
//! serialized through a mutex so concurrent runs never interleave partial
//! lines. Supports the audit/rollback query: which version did the last
//! successful deploy publish?

use anyhow::{Context, Result};
use cutover_core::domain::run::RunRecord;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Clone)]
pub struct RunHistory {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl RunHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends one run record as a single JSON line
    pub async fn append(&self, record: &RunRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serializing run record")?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("creating history directory")?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("appending run record")?;
        file.flush().await.context("flushing run record")?;

        Ok(())
    }

    /// Loads all persisted run records, oldest first
    ///
    /// A missing file means no history yet. Unparseable lines are skipped
    /// with a warning rather than poisoning the whole query.
    pub async fn load(&self) -> Result<Vec<RunRecord>> {
        let _guard = self.lock.lock().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading history file {}", self.path.display()));
            }
        };

        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unparseable history line {} in {}: {}",
                    number + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }

    /// The most recent run that completed all stages and deployed a version
    pub async fn last_successful_deploy(&self) -> Result<Option<RunRecord>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .rev()
            .find(|r| r.is_success() && r.deployed.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutover_core::domain::release::{DeployResult, VersionId};
    use cutover_core::domain::run::RunStatus;
    use tempfile::tempdir;

    fn finished(record: &mut RunRecord, status: RunStatus, deployed: Option<DeployResult>) {
        record.status = status;
        record.deployed = deployed;
        record.finished_at = Some(chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_append_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let history = RunHistory::new(dir.path().join("history.ndjson"));

        let mut first = RunRecord::begin("main", "hello-fn");
        finished(&mut first, RunStatus::Succeeded, None);
        history.append(&first).await.unwrap();

        let mut second = RunRecord::begin("main", "hello-fn");
        finished(
            &mut second,
            RunStatus::Failed {
                stage: "Build".to_string(),
            },
            None,
        );
        history.append(&second).await.unwrap();

        let records = history.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].run_id, first.run_id);
        assert_eq!(records[1].failed_stage(), Some("Build"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let history = RunHistory::new(dir.path().join("nothing-here.ndjson"));
        assert!(history.load().await.unwrap().is_empty());
        assert!(history.last_successful_deploy().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_successful_deploy_skips_failures() {
        let dir = tempdir().unwrap();
        let history = RunHistory::new(dir.path().join("history.ndjson"));

        let mut deployed = RunRecord::begin("main", "hello-fn");
        finished(
            &mut deployed,
            RunStatus::Succeeded,
            Some(DeployResult {
                version: VersionId(3),
                alias: "live".to_string(),
            }),
        );
        history.append(&deployed).await.unwrap();

        let mut failed = RunRecord::begin("main", "hello-fn");
        finished(
            &mut failed,
            RunStatus::Failed {
                stage: "Deploy".to_string(),
            },
            None,
        );
        history.append(&failed).await.unwrap();

        let last = history.last_successful_deploy().await.unwrap().unwrap();
        assert_eq!(last.run_id, deployed.run_id);
        assert_eq!(last.deployed.unwrap().version, VersionId(3));
    }
}
