//! Batch orchestrator implementation.
//!
//! One run selects its items up front, hands them to a bounded pool of
//! workers and applies every result to the manifest from a single consumer
//! loop. Workers never touch the manifest.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::catalog::SourceCatalog;
use crate::executor::{FailureKind, TaskExecutor, TaskKind, TaskOutcome, TaskResult};
use crate::manifest::{ManifestError, ManifestStore, ObjectRecord, Status};
use crate::metrics;

use super::config::BatchOptions;
use super::selection::{select_for_download, select_for_render};
use super::types::{OrchestratorError, RunSummary};

/// Drives download and render batches over a manifest it owns.
pub struct BatchOrchestrator {
    store: ManifestStore,
    options: BatchOptions,
}

impl BatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(store: ManifestStore, options: BatchOptions) -> Self {
        Self { store, options }
    }

    /// Read access to the manifest.
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Gives the manifest back.
    pub fn into_store(self) -> ManifestStore {
        self.store
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Replaces the options used by subsequent runs.
    pub fn set_options(&mut self, options: BatchOptions) {
        self.options = options;
    }

    /// Downloads the catalog's objects.
    ///
    /// Catalog entries missing from the manifest are added as pending first,
    /// unless this is a dry run.
    pub async fn run_downloads(
        &mut self,
        catalog: &dyn SourceCatalog,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<RunSummary, OrchestratorError> {
        let entries = catalog.entries().await?;
        info!(
            catalog = catalog.name(),
            entries = entries.len(),
            "Loaded source catalog"
        );

        if !self.options.dry_run {
            let added = self.store.reconcile(entries.iter().map(|e| e.to_record()));
            if added > 0 {
                info!(added, "Added new catalog entries to manifest");
            }
        }

        let selected = select_for_download(&self.store, &entries, &self.options);
        self.run_batch(executor, selected).await
    }

    /// Renders downloaded objects.
    pub async fn run_renders(
        &mut self,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<RunSummary, OrchestratorError> {
        let selected = select_for_render(&self.store, &self.options);
        self.run_batch(executor, selected).await
    }

    async fn run_batch(
        &mut self,
        executor: Arc<dyn TaskExecutor>,
        items: Vec<ObjectRecord>,
    ) -> Result<RunSummary, OrchestratorError> {
        let kind = executor.kind();
        let started = Instant::now();
        let selected = items.iter().map(|r| r.id.clone()).collect();
        let mut summary = RunSummary::new(kind, selected, self.options.dry_run);

        if self.options.dry_run {
            info!(%kind, selected = summary.selected.len(), "Dry run, nothing executed");
            summary.stats = self.store.stats();
            return Ok(summary);
        }

        let workers = self.options.workers.max(1);
        let checkpoint_every = self.options.checkpoint_every.max(1);
        info!(%kind, selected = items.len(), workers, "Starting batch");

        let (tx, mut rx) = mpsc::channel::<TaskResult>(workers);
        let dispatcher = tokio::spawn(dispatch(items, executor, workers, tx));

        let mut worked = (0.0, 0);
        let mut since_checkpoint = 0;
        while let Some(result) = rx.recv().await {
            self.apply_result(&result);
            summary.record(&result, &mut worked);

            since_checkpoint += 1;
            if since_checkpoint >= checkpoint_every {
                if let Err(e) = self.checkpoint() {
                    // Dropping the dispatcher drops its JoinSet, which aborts
                    // every worker still fetching or rendering.
                    dispatcher.abort();
                    let _ = dispatcher.await;
                    return Err(e.into());
                }
                since_checkpoint = 0;
            }
        }

        dispatcher
            .await
            .map_err(|e| OrchestratorError::WorkerPanicked(e.to_string()))?;
        self.checkpoint()?;

        summary.elapsed = started.elapsed();
        summary.stats = self.store.stats();
        info!(
            %kind,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch complete"
        );
        Ok(summary)
    }

    fn apply_result(&mut self, result: &TaskResult) {
        let label = match &result.outcome {
            TaskOutcome::Failed { kind, message, .. } => {
                warn!(
                    object_id = %result.object_id,
                    kind = %result.kind,
                    reason = %kind,
                    error = %message,
                    "Task failed"
                );
                metrics::TASK_FAILURES
                    .with_label_values(&[result.kind.as_str(), kind.as_str()])
                    .inc();
                "failed"
            }
            _ if result.is_skipped() => {
                debug!(object_id = %result.object_id, kind = %result.kind, "Task skipped, output present");
                "skipped"
            }
            _ => {
                debug!(
                    object_id = %result.object_id,
                    kind = %result.kind,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Task succeeded"
                );
                "success"
            }
        };
        metrics::TASKS_TOTAL
            .with_label_values(&[result.kind.as_str(), label])
            .inc();
        metrics::TASK_DURATION
            .with_label_values(&[result.kind.as_str()])
            .observe(result.elapsed.as_secs_f64());

        if !self
            .store
            .update(&result.object_id, |record| apply_to_record(record, result))
        {
            warn!(object_id = %result.object_id, "Result for unknown object ignored");
        }
    }

    fn checkpoint(&self) -> Result<(), ManifestError> {
        match self.store.save() {
            Ok(()) => {
                metrics::CHECKPOINTS_TOTAL.inc();
                debug!(objects = self.store.len(), "Checkpoint written");
                Ok(())
            }
            Err(e) => {
                metrics::CHECKPOINT_FAILURES.inc();
                error!("Failed to save manifest: {}", e);
                Err(e)
            }
        }
    }
}

/// Hands items to at most `workers` concurrent tasks and waits for them.
///
/// Workers live in a [`JoinSet`], so aborting the dispatcher aborts them too.
async fn dispatch(
    items: Vec<ObjectRecord>,
    executor: Arc<dyn TaskExecutor>,
    workers: usize,
    tx: mpsc::Sender<TaskResult>,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for item in items {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let executor = Arc::clone(&executor);
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = permit;
            metrics::TASKS_IN_FLIGHT.inc();
            let result = run_one(executor.as_ref(), item).await;
            metrics::TASKS_IN_FLIGHT.dec();
            // A closed channel means the run was aborted.
            let _ = tx.send(result).await;
        });
        while tasks.try_join_next().is_some() {}
    }
    drop(tx);

    while tasks.join_next().await.is_some() {}
}

/// Runs one task, turning a panic into a failed result.
async fn run_one(executor: &dyn TaskExecutor, item: ObjectRecord) -> TaskResult {
    let object_id = item.id.clone();
    let started = Instant::now();

    match AssertUnwindSafe(executor.execute(item)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!(object_id = %object_id, "Task panicked");
            TaskResult {
                object_id,
                kind: executor.kind(),
                outcome: TaskOutcome::Failed {
                    kind: FailureKind::ExternalFailure,
                    message: "task panicked".to_string(),
                    views: Vec::new(),
                },
                elapsed: started.elapsed(),
            }
        }
    }
}

/// Folds a task result into the record's fields for the task's axis.
fn apply_to_record(record: &mut ObjectRecord, result: &TaskResult) {
    match result.kind {
        TaskKind::Download => {
            record.download_attempts = record.download_attempts.saturating_add(1);
            match &result.outcome {
                TaskOutcome::Downloaded {
                    local_path,
                    content_hash,
                    ..
                } => {
                    record.download_status = Status::Success;
                    record.download_error = None;
                    record.local_path = local_path.clone();
                    if record.content_hash.is_empty() {
                        if let Some(hash) = content_hash {
                            record.content_hash = hash.clone();
                        }
                    }
                }
                TaskOutcome::Failed { message, .. } => {
                    record.download_status = Status::Failed;
                    record.download_error = Some(message.clone());
                }
                TaskOutcome::Rendered { .. } => {}
            }
        }
        TaskKind::Render => {
            record.render_attempts = record.render_attempts.saturating_add(1);
            match &result.outcome {
                TaskOutcome::Rendered { views, skipped } => {
                    record.render_status = Status::Success;
                    record.render_error = None;
                    record.views = views.clone();
                    if !skipped {
                        record.render_duration_seconds = Some(result.elapsed.as_secs_f64());
                    }
                }
                TaskOutcome::Failed { message, views, .. } => {
                    record.render_status = Status::Failed;
                    record.render_error = Some(message.clone());
                    record.views = views.clone();
                }
                TaskOutcome::Downloaded { .. } => {}
            }
        }
    }
}
