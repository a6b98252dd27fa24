mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewforge_core::{
    load_config, load_default_config, scan_download_dir, validate_config, BatchOptions,
    BatchOrchestrator, BlenderRenderer, Config, DownloadExecutor, HttpFetcher, JsonLinesCatalog,
    ManifestStore, RenderExecutor, Renderer,
};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "viewforge.toml";

#[derive(Parser)]
#[command(name = "viewforge")]
#[command(about = "Resumable download and multi-view render pipeline for 3D object datasets", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download catalog objects into the download directory
    Download {
        /// JSON-lines source catalog (overrides config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Render downloaded objects into multi-view images
    Render {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Add files already present in the download directory to the manifest
    Scan,

    /// Print manifest statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct BatchArgs {
    /// Skip objects already processed successfully
    #[arg(long)]
    resume: bool,

    /// With --resume, also retry failed objects
    #[arg(long)]
    retry_failed: bool,

    /// Process at most N objects
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Concurrent workers (overrides config)
    #[arg(long, value_name = "K")]
    workers: Option<usize>,

    /// Per-object timeout in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// List the selected objects without running anything
    #[arg(long)]
    dry_run: bool,
}

impl BatchArgs {
    fn apply(&self, mut options: BatchOptions) -> BatchOptions {
        options.resume = self.resume;
        options.retry_failed = self.retry_failed;
        options.limit = self.limit;
        options.dry_run = self.dry_run;
        if let Some(workers) = self.workers {
            options.workers = workers;
        }
        options
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Download { catalog, batch } => {
            if let Some(timeout) = batch.timeout {
                config.download.timeout_secs = timeout;
            }
            if let Some(workers) = batch.workers {
                config.download.workers = workers;
            }
            if catalog.is_some() {
                config.download.catalog = catalog;
            }
            validate_config(&config).context("Configuration validation failed")?;
            download(&config, &batch).await?;
        }
        Commands::Render { batch } => {
            if let Some(timeout) = batch.timeout {
                config.render.timeout_secs = timeout;
            }
            if let Some(workers) = batch.workers {
                config.render.workers = workers;
            }
            validate_config(&config).context("Configuration validation failed")?;
            render(&config, &batch).await?;
        }
        Commands::Scan => {
            validate_config(&config).context("Configuration validation failed")?;
            scan(&config)?;
        }
        Commands::Stats { json } => {
            let store = open_manifest(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&store.stats())?);
            } else {
                println!("{}", report::format_stats(&store.stats()));
            }
        }
    }

    if cli.metrics {
        print!("{}", viewforge_core::metrics::gather_text());
    }
    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
            load_config(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))
        }
        None => load_default_config().context("Failed to load default configuration"),
    }
}

fn open_manifest(config: &Config) -> Result<ManifestStore> {
    let store = ManifestStore::load(&config.manifest.path)
        .with_context(|| format!("Failed to load manifest {:?}", config.manifest.path))?;
    info!(
        path = %store.path().display(),
        objects = store.len(),
        "Manifest loaded"
    );
    Ok(store)
}

async fn download(config: &Config, batch: &BatchArgs) -> Result<()> {
    let Some(catalog_path) = &config.download.catalog else {
        bail!("No source catalog configured; pass --catalog or set download.catalog");
    };
    let catalog = JsonLinesCatalog::new(catalog_path);

    let fetcher = Arc::new(HttpFetcher::new().context("Failed to create HTTP client")?);
    let executor = Arc::new(DownloadExecutor::new(
        fetcher,
        &config.download.dir,
        Duration::from_secs(config.download.timeout_secs),
    ));

    let options = batch.apply(BatchOptions::for_downloads(config));
    let mut orchestrator = BatchOrchestrator::new(open_manifest(config)?, options);
    let summary = orchestrator
        .run_downloads(&catalog, executor)
        .await
        .context("Download run failed")?;

    println!("{}", report::format_summary(&summary));
    Ok(())
}

async fn render(config: &Config, batch: &BatchArgs) -> Result<()> {
    let renderer = Arc::new(BlenderRenderer::from_config(&config.render));
    if !batch.dry_run {
        renderer
            .validate()
            .await
            .context("Render program is not usable")?;
    }

    let executor = Arc::new(RenderExecutor::new(
        renderer,
        &config.download.dir,
        &config.render.output_dir,
        Duration::from_secs(config.render.timeout_secs),
        config.render.view_count,
    ));

    let options = batch.apply(BatchOptions::for_renders(config));
    let mut orchestrator = BatchOrchestrator::new(open_manifest(config)?, options);
    let summary = orchestrator
        .run_renders(executor)
        .await
        .context("Render run failed")?;

    println!("{}", report::format_summary(&summary));
    Ok(())
}

fn scan(config: &Config) -> Result<()> {
    let mut store = open_manifest(config)?;
    let found = scan_download_dir(&config.download.dir, &config.download.supported_extensions)
        .with_context(|| format!("Failed to scan {:?}", config.download.dir))?;
    let scanned = found.len();
    let added = store.reconcile(found);
    store.save().context("Failed to save manifest")?;

    info!(scanned, added, "Scan complete");
    println!("Scanned {} files, added {} new objects", scanned, added);
    println!("{}", report::format_stats(&store.stats()));
    Ok(())
}
