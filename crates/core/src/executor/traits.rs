//! Trait definitions for the executor module.

use async_trait::async_trait;

use super::error::{FetchError, RenderError};
use super::types::{FetchRequest, FetchResult, RenderJob, TaskKind, TaskResult};
use crate::manifest::ObjectRecord;

/// Fetches a remote resource to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads `request.url` to `request.target`.
    ///
    /// Implementations must not leave a partial file at `target` on failure or
    /// cancellation; the executor treats an existing target as a finished
    /// download.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

/// Renders one object into a directory of view images.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the name of this renderer implementation.
    fn name(&self) -> &str;

    /// Runs the renderer for `job`.
    ///
    /// Success only means the renderer exited cleanly; the caller verifies
    /// the images it was supposed to write. Dropping the returned future must
    /// terminate any spawned process.
    async fn render(&self, job: &RenderJob) -> Result<(), RenderError>;

    /// Validates that the renderer is properly configured and ready.
    async fn validate(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Runs one task for one object and reduces its outcome to a [`TaskResult`].
///
/// Executors never fail: every error is folded into the result. They also
/// never touch the manifest.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// The lifecycle axis this executor advances.
    fn kind(&self) -> TaskKind;

    /// Executes the task for `item`.
    async fn execute(&self, item: ObjectRecord) -> TaskResult;
}
