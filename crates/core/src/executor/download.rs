//! Download task executor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use super::traits::{Fetcher, TaskExecutor};
use super::types::{FailureKind, FetchRequest, TaskKind, TaskOutcome, TaskResult};
use crate::manifest::{truncate_message, ObjectRecord};

/// Fetches one object into `{download_dir}/{local_path}`.
pub struct DownloadExecutor {
    fetcher: Arc<dyn Fetcher>,
    download_dir: PathBuf,
    timeout: Duration,
}

impl DownloadExecutor {
    pub fn new(fetcher: Arc<dyn Fetcher>, download_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            fetcher,
            download_dir: download_dir.into(),
            timeout,
        }
    }

    fn local_path(item: &ObjectRecord) -> String {
        if item.local_path.is_empty() {
            format!("{}/{}.{}", item.source, item.id, item.file_type)
        } else {
            item.local_path.clone()
        }
    }

    async fn run(&self, item: &ObjectRecord) -> TaskOutcome {
        let local_path = Self::local_path(item);
        let target = self.download_dir.join(&local_path);

        if tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            debug!(object_id = %item.id, path = %target.display(), "Already downloaded, skipping");
            return TaskOutcome::Downloaded {
                local_path,
                content_hash: None,
                skipped: true,
            };
        }

        if item.source_url.is_empty() {
            return failed(FailureKind::ExternalFailure, "no source URL");
        }

        let request = FetchRequest {
            object_id: item.id.clone(),
            url: item.source_url.clone(),
            target,
        };

        match timeout(self.timeout, self.fetcher.fetch(&request)).await {
            Ok(Ok(fetched)) => TaskOutcome::Downloaded {
                local_path,
                content_hash: Some(fetched.sha256),
                skipped: false,
            },
            Ok(Err(e)) => failed(e.failure_kind(), &e.to_string()),
            Err(_) => failed(
                FailureKind::Timeout,
                &format!("Timeout after {}s", self.timeout.as_secs_f64()),
            ),
        }
    }
}

fn failed(kind: FailureKind, message: &str) -> TaskOutcome {
    TaskOutcome::Failed {
        kind,
        message: truncate_message(message),
        views: Vec::new(),
    }
}

#[async_trait]
impl TaskExecutor for DownloadExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Download
    }

    async fn execute(&self, item: ObjectRecord) -> TaskResult {
        let start = Instant::now();
        let outcome = self.run(&item).await;
        TaskResult {
            object_id: item.id,
            kind: TaskKind::Download,
            outcome,
            elapsed: start.elapsed(),
        }
    }
}
