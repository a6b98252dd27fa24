//! Types for the batch orchestrator.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::executor::{FailureKind, TaskKind, TaskOutcome, TaskResult};
use crate::manifest::{ManifestError, ManifestStats};

/// Number of failure messages kept in a [`RunSummary`].
pub const MAX_FAILURE_SAMPLES: usize = 5;

/// Errors that abort a batch run.
///
/// Per-object failures are recorded in the manifest and never surface here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Manifest could not be loaded or saved.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Source catalog could not be read.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The dispatcher task died before all work was handed out.
    #[error("worker pool failed: {0}")]
    WorkerPanicked(String),
}

/// One failed object, kept for the end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSample {
    pub object_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What a batch run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub kind: TaskKind,
    pub dry_run: bool,
    /// Ids chosen by the selection policy, in manifest order.
    pub selected: Vec<String>,
    /// Results applied to the manifest.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successes that did not need to run the external operation.
    pub skipped: usize,
    /// The first few failures, at most [`MAX_FAILURE_SAMPLES`].
    pub failures: Vec<FailureSample>,
    /// Mean elapsed seconds of successful, non-skipped tasks.
    pub average_task_seconds: Option<f64>,
    pub elapsed: Duration,
    /// Counts from the manifest after the run.
    pub stats: ManifestStats,
}

impl RunSummary {
    pub(crate) fn new(kind: TaskKind, selected: Vec<String>, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            selected,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
            average_task_seconds: None,
            elapsed: Duration::ZERO,
            stats: ManifestStats::default(),
        }
    }

    /// Accounts one applied result. `worked` accumulates seconds and count of
    /// the tasks that actually ran.
    pub(crate) fn record(&mut self, result: &TaskResult, worked: &mut (f64, usize)) {
        self.attempted += 1;
        match &result.outcome {
            TaskOutcome::Failed { kind, message, .. } => {
                self.failed += 1;
                if self.failures.len() < MAX_FAILURE_SAMPLES {
                    self.failures.push(FailureSample {
                        object_id: result.object_id.clone(),
                        kind: *kind,
                        message: message.clone(),
                    });
                }
            }
            _ => {
                self.succeeded += 1;
                if result.is_skipped() {
                    self.skipped += 1;
                } else {
                    worked.0 += result.elapsed.as_secs_f64();
                    worked.1 += 1;
                }
            }
        }
        if worked.1 > 0 {
            self.average_task_seconds = Some(worked.0 / worked.1 as f64);
        }
    }
}
