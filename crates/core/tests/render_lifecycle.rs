//! Render batch integration tests.
//!
//! These tests drive the orchestrator end to end against a mock renderer:
//! selection -> bounded execution -> result application -> checkpointing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use viewforge_core::{
    executor::view_image_name,
    testing::{fixtures, MockRenderer},
    BatchOptions, BatchOrchestrator, FailureKind, ManifestStore, ObjectRecord, OrchestratorError,
    RenderExecutor, Status, TaskExecutor, TaskKind, TaskOutcome, TaskResult,
};

const VIEW_COUNT: usize = 6;

/// Test helper holding the directories of one run.
struct TestHarness {
    renderer: Arc<MockRenderer>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            renderer: Arc::new(MockRenderer::new()),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn manifest_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("manifest.json")
    }

    fn output_root(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("renders")
    }

    fn executor(&self, timeout: Duration) -> Arc<RenderExecutor> {
        Arc::new(RenderExecutor::new(
            self.renderer.clone(),
            self.temp_dir.path().join("objects"),
            self.output_root(),
            timeout,
            VIEW_COUNT,
        ))
    }

    /// Saves `records` as the manifest on disk.
    fn seed(&self, records: Vec<ObjectRecord>) {
        let store = fixtures::store_with(self.temp_dir.path(), records);
        store.save().expect("Failed to save seed manifest");
    }

    fn orchestrator(&self, options: BatchOptions) -> BatchOrchestrator {
        let store = ManifestStore::load(self.manifest_path()).expect("Failed to load manifest");
        BatchOrchestrator::new(store, options)
    }

    fn reload(&self) -> ManifestStore {
        ManifestStore::load(self.manifest_path()).expect("Failed to reload manifest")
    }
}

fn resume() -> BatchOptions {
    BatchOptions::default().with_resume(true).with_workers(4)
}

#[tokio::test]
async fn test_render_run_records_views_and_failures() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(5));
    harness.renderer.fail_object("obj-003").await;

    let mut orchestrator = harness.orchestrator(resume());
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.kind, TaskKind::Render);
    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].object_id, "obj-003");
    assert_eq!(summary.failures[0].kind, FailureKind::ExternalFailure);
    assert!(summary.average_task_seconds.is_some());
    assert_eq!(summary.stats.rendered, 4);
    assert_eq!(summary.stats.render_failed, 1);

    let store = harness.reload();
    let ok = store.get("obj-000").unwrap();
    assert_eq!(ok.render_status, Status::Success);
    assert_eq!(ok.views.len(), VIEW_COUNT);
    assert_eq!(ok.views[5].image_path, "obj-000/obj-000_view_5.png");
    assert!(ok.render_duration_seconds.is_some());
    assert_eq!(ok.render_attempts, 1);

    let failed = store.get("obj-003").unwrap();
    assert_eq!(failed.render_status, Status::Failed);
    assert!(failed
        .render_error
        .as_deref()
        .unwrap()
        .contains("mock render failure"));
}

#[tokio::test]
async fn test_resume_is_idempotent() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(6));
    harness.renderer.fail_object("obj-001").await;

    let mut orchestrator = harness.orchestrator(resume());
    orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();
    let after_first = std::fs::read_to_string(harness.manifest_path()).unwrap();
    let renders_after_first = harness.renderer.render_count().await;

    let mut orchestrator = harness.orchestrator(resume());
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();
    let after_second = std::fs::read_to_string(harness.manifest_path()).unwrap();

    assert!(summary.selected.is_empty());
    assert_eq!(summary.attempted, 0);
    assert_eq!(harness.renderer.render_count().await, renders_after_first);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_selection_scenarios() {
    let harness = TestHarness::new();
    harness.seed(vec![
        fixtures::downloaded_record("A"),
        fixtures::downloaded_record("B").with_render_status(Status::Failed),
        fixtures::downloaded_record("C").with_download_status(Status::Pending),
    ]);

    let cases = [
        (resume(), vec!["A"]),
        (resume().with_retry_failed(true), vec!["A", "B"]),
        (BatchOptions::default(), vec!["A", "B"]),
        (BatchOptions::default().with_retry_failed(true), vec!["A", "B"]),
    ];

    for (options, expected) in cases {
        let mut orchestrator = harness.orchestrator(options.with_dry_run(true));
        let summary = orchestrator
            .run_renders(harness.executor(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.selected, expected);
    }

    assert_eq!(harness.renderer.render_count().await, 0);
}

#[tokio::test]
async fn test_retry_failed_rerenders_failed_items() {
    let harness = TestHarness::new();
    harness.seed(vec![
        fixtures::downloaded_record("A"),
        fixtures::downloaded_record("B").with_render_status(Status::Failed),
    ]);

    let mut orchestrator = harness.orchestrator(resume().with_retry_failed(true));
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    let store = harness.reload();
    let b = store.get("B").unwrap();
    assert_eq!(b.render_status, Status::Success);
    assert!(b.render_error.is_none());
}

#[tokio::test]
async fn test_incomplete_output_is_failure() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(3));
    harness.renderer.set_views_to_write(VIEW_COUNT - 2).await;

    let mut orchestrator = harness.orchestrator(resume());
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.failed, 3);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Incomplete));

    let store = harness.reload();
    for record in store.iter() {
        assert_eq!(record.render_status, Status::Failed);
        assert_eq!(record.render_error.as_deref(), Some("Only 4/6 views created"));
        assert_eq!(record.views.len(), VIEW_COUNT - 2);
    }
}

#[tokio::test]
async fn test_existing_output_is_not_rerendered() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(2));
    let done = harness.output_root().join("obj-000");
    std::fs::create_dir_all(&done).unwrap();
    for i in 0..VIEW_COUNT {
        std::fs::write(done.join(view_image_name("obj-000", i)), b"png").unwrap();
    }

    let mut orchestrator = harness.orchestrator(BatchOptions::default());
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    let jobs = harness.renderer.recorded_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].object_id, "obj-001");
}

#[tokio::test]
async fn test_concurrency_is_bounded_by_workers() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(12));
    harness
        .renderer
        .set_render_duration(Duration::from_millis(50))
        .await;

    let mut orchestrator = harness.orchestrator(BatchOptions::default().with_workers(3));
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 12);
    assert!(harness.renderer.max_concurrent() <= 3);
    assert!(harness.renderer.max_concurrent() >= 1);
}

#[tokio::test]
async fn test_timeout_is_prompt_and_recorded() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(2));
    harness
        .renderer
        .set_render_duration(Duration::from_secs(10))
        .await;

    let started = Instant::now();
    let mut orchestrator = harness.orchestrator(resume());
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(summary.failed, 2);
    let store = harness.reload();
    let record = store.get("obj-000").unwrap();
    assert_eq!(record.render_status, Status::Failed);
    assert_eq!(record.render_error.as_deref(), Some("Timeout after 0.1s"));
}

#[tokio::test]
async fn test_limit_caps_work() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(10));

    let mut orchestrator = harness.orchestrator(resume().with_limit(4));
    let summary = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(summary.attempted, 4);
    assert_eq!(
        summary.selected,
        vec!["obj-000", "obj-001", "obj-002", "obj-003"]
    );
    assert_eq!(harness.reload().stats().render_pending, 6);
}

/// Executor that renders instantly, except for one object that waits and
/// then records what the manifest on disk looks like.
struct ObservingExecutor {
    watched_id: String,
    manifest_path: std::path::PathBuf,
    observed: Mutex<Option<usize>>,
}

#[async_trait]
impl TaskExecutor for ObservingExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Render
    }

    async fn execute(&self, item: ObjectRecord) -> TaskResult {
        if item.id == self.watched_id {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let on_disk = ManifestStore::load(&self.manifest_path).unwrap();
            *self.observed.lock().unwrap() = Some(on_disk.stats().rendered);
        }
        TaskResult {
            object_id: item.id,
            kind: TaskKind::Render,
            outcome: TaskOutcome::Rendered {
                views: Vec::new(),
                skipped: false,
            },
            elapsed: Duration::from_millis(1),
        }
    }
}

#[tokio::test]
async fn test_checkpoints_during_run() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(5));

    let observer = Arc::new(ObservingExecutor {
        watched_id: "obj-004".to_string(),
        manifest_path: harness.manifest_path(),
        observed: Mutex::new(None),
    });

    let options = BatchOptions::default()
        .with_workers(1)
        .with_checkpoint_every(2);
    let mut orchestrator = harness.orchestrator(options);
    orchestrator.run_renders(observer.clone()).await.unwrap();

    // Four results were applied before the last task finished: two checkpoints.
    assert_eq!(*observer.observed.lock().unwrap(), Some(4));
    assert_eq!(harness.reload().stats().rendered, 5);
}

/// Executor that panics for one object.
struct PanickyExecutor;

#[async_trait]
impl TaskExecutor for PanickyExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Render
    }

    async fn execute(&self, item: ObjectRecord) -> TaskResult {
        if item.id == "obj-001" {
            panic!("renderer bug");
        }
        TaskResult {
            object_id: item.id,
            kind: TaskKind::Render,
            outcome: TaskOutcome::Rendered {
                views: Vec::new(),
                skipped: false,
            },
            elapsed: Duration::from_millis(1),
        }
    }
}

#[tokio::test]
async fn test_panicking_task_does_not_abort_batch() {
    let harness = TestHarness::new();
    harness.seed(fixtures::downloaded_records(3));

    let mut orchestrator = harness.orchestrator(resume());
    let summary = orchestrator
        .run_renders(Arc::new(PanickyExecutor))
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.failed, 1);
    let store = harness.reload();
    assert_eq!(
        store.get("obj-001").unwrap().render_error.as_deref(),
        Some("task panicked")
    );
}

#[tokio::test]
async fn test_checkpoint_failure_aborts_run() {
    let harness = TestHarness::new();
    let nested = harness.temp_dir.path().join("sub").join("manifest.json");
    let mut store = ManifestStore::load(&nested).unwrap();
    for record in fixtures::downloaded_records(3) {
        store.put(record);
    }
    // The manifest directory turns into a regular file.
    std::fs::write(harness.temp_dir.path().join("sub"), b"not a dir").unwrap();

    let mut orchestrator =
        BatchOrchestrator::new(store, BatchOptions::default().with_checkpoint_every(1));
    let err = orchestrator
        .run_renders(harness.executor(Duration::from_secs(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Manifest(_)));
}

/// Executor that finishes one object at once and holds the other.
struct SlowTailExecutor {
    slow_id: String,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl TaskExecutor for SlowTailExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Render
    }

    async fn execute(&self, item: ObjectRecord) -> TaskResult {
        if item.id == self.slow_id {
            tokio::time::sleep(Duration::from_millis(500)).await;
            self.finished.store(true, Ordering::SeqCst);
        }
        TaskResult {
            object_id: item.id,
            kind: TaskKind::Render,
            outcome: TaskOutcome::Rendered {
                views: Vec::new(),
                skipped: false,
            },
            elapsed: Duration::from_millis(1),
        }
    }
}

#[tokio::test]
async fn test_checkpoint_failure_stops_in_flight_tasks() {
    let harness = TestHarness::new();
    let nested = harness.temp_dir.path().join("sub").join("manifest.json");
    let mut store = ManifestStore::load(&nested).unwrap();
    for record in fixtures::downloaded_records(2) {
        store.put(record);
    }
    std::fs::write(harness.temp_dir.path().join("sub"), b"not a dir").unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let executor = Arc::new(SlowTailExecutor {
        slow_id: "obj-001".to_string(),
        finished: finished.clone(),
    });

    let options = BatchOptions::default()
        .with_workers(2)
        .with_checkpoint_every(1);
    let mut orchestrator = BatchOrchestrator::new(store, options);
    let err = orchestrator.run_renders(executor).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Manifest(_)));
    assert!(!finished.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(
        !finished.load(Ordering::SeqCst),
        "worker kept running after the run failed"
    );
}
