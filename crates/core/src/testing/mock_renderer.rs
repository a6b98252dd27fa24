//! Mock renderer for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::InFlight;
use crate::executor::{view_image_name, RenderError, RenderJob, Renderer};

/// Mock implementation of the Renderer trait.
///
/// Writes `views_to_write` view images (each with one mask) into the job's
/// output directory. Defaults to six views and no simulated latency.
///
/// # Example
///
/// ```rust,ignore
/// use viewforge_core::testing::MockRenderer;
///
/// let renderer = MockRenderer::new();
/// renderer.set_views_to_write(4).await; // clean exit, incomplete output
/// renderer.set_render_duration(Duration::from_secs(10)).await;
/// ```
#[derive(Debug)]
pub struct MockRenderer {
    jobs: Arc<RwLock<Vec<RenderJob>>>,
    next_error: Arc<RwLock<Option<RenderError>>>,
    failing_ids: Arc<RwLock<HashSet<String>>>,
    render_duration_ms: Arc<RwLock<u64>>,
    views_to_write: Arc<RwLock<usize>>,
    in_flight: InFlight,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    /// Create a new mock renderer.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing_ids: Arc::new(RwLock::new(HashSet::new())),
            render_duration_ms: Arc::new(RwLock::new(0)),
            views_to_write: Arc::new(RwLock::new(6)),
            in_flight: InFlight::default(),
        }
    }

    /// Get all recorded jobs.
    pub async fn recorded_jobs(&self) -> Vec<RenderJob> {
        self.jobs.read().await.clone()
    }

    /// Get the number of renders started.
    pub async fn render_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Configure the next render to fail with the given error.
    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every render of `object_id` exit with code 1.
    pub async fn fail_object(&self, object_id: impl Into<String>) {
        self.failing_ids.write().await.insert(object_id.into());
    }

    /// Set the simulated render duration.
    pub async fn set_render_duration(&self, duration: Duration) {
        *self.render_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Set how many view images a successful render writes.
    pub async fn set_views_to_write(&self, count: usize) {
        *self.views_to_write.write().await = count;
    }

    /// Highest number of renders observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
        self.jobs.write().await.push(job.clone());
        let _guard = self.in_flight.enter();

        let duration = *self.render_duration_ms.read().await;
        if duration > 0 {
            tokio::time::sleep(Duration::from_millis(duration)).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if self.failing_ids.read().await.contains(&job.object_id) {
            return Err(RenderError::process_failed(Some(1), "Error: mock render failure"));
        }

        tokio::fs::create_dir_all(&job.output_dir).await?;
        let count = *self.views_to_write.read().await;
        for index in 0..count {
            let image = view_image_name(&job.object_id, index);
            tokio::fs::write(job.output_dir.join(&image), b"png").await?;
            let mask = format!("{}_view_{}_mask0001.png", job.object_id, index);
            tokio::fs::write(job.output_dir.join(mask), b"png").await?;
        }

        Ok(())
    }
}
