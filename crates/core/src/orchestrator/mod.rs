//! Batch orchestrator for resumable download and render runs.
//!
//! A run is three steps:
//! - **Selection**: a pure function of the manifest and [`BatchOptions`]
//! - **Execution**: a fixed-size worker pool running a [`TaskExecutor`](crate::executor::TaskExecutor)
//! - **Application**: a single consumer applying results to the manifest and
//!   checkpointing it every `checkpoint_every` results and once at the end

mod config;
mod runner;
mod selection;
mod types;

pub use config::BatchOptions;
pub use runner::BatchOrchestrator;
pub use selection::{select_for_download, select_for_render};
pub use types::{FailureSample, OrchestratorError, RunSummary, MAX_FAILURE_SAMPLES};
