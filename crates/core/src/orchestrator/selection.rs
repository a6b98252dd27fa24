//! Selection policy: which items a run works on.
//!
//! Pure functions of the manifest and the run options, evaluated once per run.

use crate::catalog::CatalogEntry;
use crate::manifest::{ManifestStore, ObjectRecord, Status};

use super::config::BatchOptions;

/// Whether an item with `status` on the task's axis is selected.
fn eligible(status: Status, attempts: u32, options: &BatchOptions) -> bool {
    if !options.resume {
        return true;
    }
    match status {
        Status::Pending => true,
        Status::Failed => {
            options.retry_failed && (options.max_attempts == 0 || attempts < options.max_attempts)
        }
        Status::Success => false,
    }
}

fn apply_limit(mut items: Vec<ObjectRecord>, options: &BatchOptions) -> Vec<ObjectRecord> {
    if let Some(limit) = options.limit {
        items.truncate(limit);
    }
    items
}

/// Items to render, in manifest order.
///
/// Only items whose download succeeded are ever considered.
pub fn select_for_render(store: &ManifestStore, options: &BatchOptions) -> Vec<ObjectRecord> {
    let items = store
        .iter()
        .filter(|r| r.download_status == Status::Success)
        .filter(|r| eligible(r.render_status, r.render_attempts, options))
        .cloned()
        .collect();
    apply_limit(items, options)
}

/// Items to download, in catalog order.
///
/// Entries not yet in the manifest are returned as fresh pending records;
/// existing records keep their state. Duplicate catalog ids are selected once.
pub fn select_for_download(
    store: &ManifestStore,
    entries: &[CatalogEntry],
    options: &BatchOptions,
) -> Vec<ObjectRecord> {
    let mut seen = std::collections::HashSet::new();
    let items = entries
        .iter()
        .filter(|e| seen.insert(e.id.as_str()))
        .map(|e| match store.get(&e.id) {
            Some(record) => record.clone(),
            None => e.to_record(),
        })
        .filter(|r| eligible(r.download_status, r.download_attempts, options))
        .collect();
    apply_limit(items, options)
}
