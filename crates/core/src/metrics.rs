//! Prometheus metrics for batch runs.
//!
//! Collectors are process-global. [`REGISTRY`] holds all of them; a binary
//! with its own registry can register them through [`all_metrics`] instead.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Registry holding every collector of this module.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

// =============================================================================
// Task Metrics
// =============================================================================

/// Tasks finished total by kind and result.
pub static TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("viewforge_tasks_total", "Total tasks finished"),
        &["kind", "result"], // kind: "download", "render"; result: "success", "failed", "skipped"
    )
    .unwrap()
});

/// Task failures total by kind and failure class.
pub static TASK_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("viewforge_task_failures_total", "Total task failures"),
        &["kind", "reason"], // reason: "timeout", "external_failure", "incomplete"
    )
    .unwrap()
});

/// Task duration in seconds.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("viewforge_task_duration_seconds", "Duration of tasks")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["kind"],
    )
    .unwrap()
});

/// Tasks currently running.
pub static TASKS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("viewforge_tasks_in_flight", "Tasks currently running").unwrap()
});

// =============================================================================
// Manifest Metrics
// =============================================================================

/// Manifest checkpoints written total.
pub static CHECKPOINTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "viewforge_checkpoints_total",
        "Total manifest snapshots written",
    )
    .unwrap()
});

/// Checkpoint failures total.
pub static CHECKPOINT_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "viewforge_checkpoint_failures_total",
        "Total manifest snapshots that failed to write",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TASKS_TOTAL.clone()),
        Box::new(TASK_FAILURES.clone()),
        Box::new(TASK_DURATION.clone()),
        Box::new(TASKS_IN_FLIGHT.clone()),
        Box::new(CHECKPOINTS_TOTAL.clone()),
        Box::new(CHECKPOINT_FAILURES.clone()),
    ]
}

/// Encode all metrics as Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
