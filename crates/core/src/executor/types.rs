//! Types for the task executor module.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manifest::{Status, View};

/// Which lifecycle axis a task advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Download,
    Render,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::Render => "render",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The external operation exceeded its time budget and was terminated.
    Timeout,
    /// The external process or request reported an error.
    ExternalFailure,
    /// The external process reported success but required outputs are missing.
    Incomplete,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ExternalFailure => "external_failure",
            FailureKind::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single task produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The object file is present at `local_path`.
    Downloaded {
        local_path: String,
        /// SHA-256 of the fetched bytes; `None` when the fetch was skipped.
        content_hash: Option<String>,
        skipped: bool,
    },
    /// Every expected view is present.
    Rendered { views: Vec<View>, skipped: bool },
    /// The task failed; `views` holds whatever render output was found anyway.
    Failed {
        kind: FailureKind,
        message: String,
        views: Vec<View>,
    },
}

/// Result of one task, handed back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub object_id: String,
    pub kind: TaskKind,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

impl TaskResult {
    /// Status this result assigns to the task's lifecycle axis.
    pub fn status(&self) -> Status {
        match self.outcome {
            TaskOutcome::Failed { .. } => Status::Failed,
            _ => Status::Success,
        }
    }

    /// Error message, for failed tasks.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Failure class, for failed tasks.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            TaskOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Views found on disk (render tasks only).
    pub fn views(&self) -> &[View] {
        match &self.outcome {
            TaskOutcome::Rendered { views, .. } | TaskOutcome::Failed { views, .. } => views,
            TaskOutcome::Downloaded { .. } => &[],
        }
    }

    /// Whether the external operation was skipped because its output already existed.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self.outcome,
            TaskOutcome::Downloaded { skipped: true, .. } | TaskOutcome::Rendered { skipped: true, .. }
        )
    }
}

/// A request to fetch one remote object to a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub object_id: String,
    pub url: String,
    /// Final location of the file. Only a complete transfer may appear here.
    pub target: PathBuf,
}

/// Summary of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the written bytes.
    pub sha256: String,
}

/// A request to render one object into its output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub object_id: String,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
}
