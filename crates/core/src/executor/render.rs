//! Render task executor and output verification.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex_lite::Regex;
use tokio::time::timeout;
use tracing::debug;

use super::traits::{Renderer, TaskExecutor};
use super::types::{FailureKind, RenderJob, TaskKind, TaskOutcome, TaskResult};
use crate::manifest::{truncate_message, ObjectRecord, View};

/// Renders one object into `{output_root}/{object_id}` and verifies the views.
pub struct RenderExecutor {
    renderer: Arc<dyn Renderer>,
    input_root: PathBuf,
    output_root: PathBuf,
    timeout: Duration,
    view_count: usize,
}

impl RenderExecutor {
    /// `input_root` is the directory record `local_path`s are relative to.
    pub fn new(
        renderer: Arc<dyn Renderer>,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        timeout: Duration,
        view_count: usize,
    ) -> Self {
        Self {
            renderer,
            input_root: input_root.into(),
            output_root: output_root.into(),
            timeout,
            view_count,
        }
    }

    async fn run(&self, item: &ObjectRecord) -> TaskOutcome {
        let output_dir = self.output_root.join(&item.id);

        let existing = find_views(&self.output_root, &item.id, self.view_count).await;
        if existing.len() == self.view_count {
            debug!(object_id = %item.id, "All views already rendered, skipping");
            return TaskOutcome::Rendered {
                views: existing,
                skipped: true,
            };
        }

        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            return failed(
                FailureKind::ExternalFailure,
                &format!("Failed to create output directory: {}", e),
                Vec::new(),
            );
        }

        let job = RenderJob {
            object_id: item.id.clone(),
            input_path: self.input_root.join(&item.local_path),
            output_dir,
        };

        match timeout(self.timeout, self.renderer.render(&job)).await {
            Err(_) => {
                return failed(
                    FailureKind::Timeout,
                    &format!("Timeout after {}s", self.timeout.as_secs_f64()),
                    Vec::new(),
                )
            }
            Ok(Err(e)) => return failed(e.failure_kind(), &e.to_string(), Vec::new()),
            Ok(Ok(())) => {}
        }

        let views = find_views(&self.output_root, &item.id, self.view_count).await;
        if views.len() == self.view_count {
            TaskOutcome::Rendered {
                views,
                skipped: false,
            }
        } else {
            let message = format!("Only {}/{} views created", views.len(), self.view_count);
            failed(FailureKind::Incomplete, &message, views)
        }
    }
}

fn failed(kind: FailureKind, message: &str, views: Vec<View>) -> TaskOutcome {
    TaskOutcome::Failed {
        kind,
        message: truncate_message(message),
        views,
    }
}

#[async_trait]
impl TaskExecutor for RenderExecutor {
    fn kind(&self) -> TaskKind {
        TaskKind::Render
    }

    async fn execute(&self, item: ObjectRecord) -> TaskResult {
        let start = Instant::now();
        let outcome = self.run(&item).await;
        TaskResult {
            object_id: item.id,
            kind: TaskKind::Render,
            outcome,
            elapsed: start.elapsed(),
        }
    }
}

/// Image file name for one view: `{object_id}_view_{index}.png`.
pub fn view_image_name(object_id: &str, index: usize) -> String {
    format!("{}_view_{}.png", object_id, index)
}

/// Collects the views present in `{output_root}/{object_id}`.
///
/// A view counts when its image exists; its mask is the first
/// `{object_id}_view_{index}_mask*.png` in name order, or empty. Paths are
/// relative to `output_root`. Views are returned in index order and only
/// indices below `view_count` are considered.
pub async fn find_views(output_root: &Path, object_id: &str, view_count: usize) -> Vec<View> {
    let dir = output_root.join(object_id);
    let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
        return Vec::new();
    };

    let mut names = HashSet::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(name) = entry.file_name().into_string() {
            names.insert(name);
        }
    }

    let escaped = regex_lite::escape(object_id);
    let mask_re = match Regex::new(&format!(r"^{}_view_(\d+)_mask.*\.png$", escaped)) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut masks: BTreeMap<usize, String> = BTreeMap::new();
    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort();
    for name in sorted {
        if let Some(index) = mask_re
            .captures(name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
        {
            masks.entry(index).or_insert_with(|| name.clone());
        }
    }

    (0..view_count)
        .filter_map(|index| {
            let image = view_image_name(object_id, index);
            if !names.contains(&image) {
                return None;
            }
            Some(View {
                view_index: index as u32,
                image_path: format!("{}/{}", object_id, image),
                mask_path: masks
                    .get(&index)
                    .map(|m| format!("{}/{}", object_id, m))
                    .unwrap_or_default(),
            })
        })
        .collect()
}
