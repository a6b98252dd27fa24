//! Per-object task execution.
//!
//! Executors run one download or render for one object and fold every
//! failure into a [`TaskResult`]. They own the time budget of a task: when it
//! is exceeded the underlying future is dropped, which terminates any child
//! process and discards partial files.
//!
//! The external collaborators sit behind two traits:
//! - [`Fetcher`]: moves bytes from a URL to a local file ([`HttpFetcher`])
//! - [`Renderer`]: runs a render program for one model ([`BlenderRenderer`])

mod blender;
mod download;
mod error;
mod http;
mod render;
mod traits;
mod types;

pub use blender::BlenderRenderer;
pub use download::DownloadExecutor;
pub use error::{FetchError, RenderError};
pub use http::HttpFetcher;
pub use render::{find_views, view_image_name, RenderExecutor};
pub use traits::{Fetcher, Renderer, TaskExecutor};
pub use types::{
    FailureKind, FetchRequest, FetchResult, RenderJob, TaskKind, TaskOutcome, TaskResult,
};
