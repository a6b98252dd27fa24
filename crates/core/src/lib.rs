pub mod catalog;
pub mod config;
pub mod executor;
pub mod manifest;
pub mod metrics;
pub mod orchestrator;
pub mod testing;

pub use catalog::{
    scan_download_dir, CatalogEntry, CatalogError, JsonLinesCatalog, SourceCatalog, StaticCatalog,
};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use executor::{
    BlenderRenderer, DownloadExecutor, FailureKind, Fetcher, HttpFetcher, RenderExecutor,
    Renderer, TaskExecutor, TaskKind, TaskOutcome, TaskResult,
};
pub use manifest::{
    ManifestError, ManifestFilter, ManifestStats, ManifestStore, ObjectRecord, Status, View,
};
pub use orchestrator::{BatchOptions, BatchOrchestrator, OrchestratorError, RunSummary};
