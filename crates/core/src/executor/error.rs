//! Error types for the task executor collaborators.

use std::path::PathBuf;
use thiserror::Error;

use super::types::FailureKind;

/// Errors reported by a [`Fetcher`](super::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Http { status: u16, url: String },

    /// Request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The transfer exceeded its time budget.
    #[error("request timed out")]
    Timeout,

    /// Writing the downloaded bytes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// How this error is recorded against the object.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::Timeout,
            _ => FailureKind::ExternalFailure,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Errors reported by a [`Renderer`](super::Renderer).
#[derive(Debug, Error)]
pub enum RenderError {
    /// Render program binary not found.
    #[error("render program not found at path: {path}")]
    RendererNotFound { path: PathBuf },

    /// Input model file not found.
    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Render process exited unsuccessfully.
    #[error("render process exited with code {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// I/O error while running the render process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Creates a process failure from an exit code and captured stderr.
    pub fn process_failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            code,
            stderr: stderr.into(),
        }
    }

    /// How this error is recorded against the object.
    pub fn failure_kind(&self) -> FailureKind {
        FailureKind::ExternalFailure
    }
}
