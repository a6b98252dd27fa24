//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the executor collaborators,
//! so batch runs can be exercised end to end without network access or a
//! render program installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewforge_core::testing::{fixtures, MockFetcher, MockRenderer};
//!
//! let renderer = MockRenderer::new();
//! renderer.fail_object("broken").await;
//!
//! let mut store = fixtures::store_with(dir.path(), fixtures::downloaded_records(5));
//! // Build a RenderExecutor around the mock and run a batch...
//! ```

mod mock_fetcher;
mod mock_renderer;

pub use mock_fetcher::{MockFetcher, MOCK_PAYLOAD};
pub use mock_renderer::MockRenderer;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks how many calls are running at once and the highest value seen.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
}

impl InFlight {
    pub(crate) fn enter(&self) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            current: Arc::clone(&self.current),
        }
    }

    pub(crate) fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub(crate) struct InFlightGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::catalog::CatalogEntry;
    use crate::manifest::{ManifestStore, ObjectRecord, Status};

    /// Create a record that has been downloaded but not rendered.
    pub fn downloaded_record(id: &str) -> ObjectRecord {
        ObjectRecord::new(
            id,
            format!("https://example.com/{}.glb", id),
            format!("github/{}.glb", id),
            "glb",
            "github",
        )
        .with_download_status(Status::Success)
    }

    /// Create `count` downloaded records named `obj-000`, `obj-001`, ...
    pub fn downloaded_records(count: usize) -> Vec<ObjectRecord> {
        (0..count)
            .map(|i| downloaded_record(&format!("obj-{:03}", i)))
            .collect()
    }

    /// Create a catalog entry pointing at a fake remote model.
    pub fn catalog_entry(id: &str) -> CatalogEntry {
        CatalogEntry::new(id, format!("https://example.com/{}.glb", id), "github")
    }

    /// Create `count` catalog entries named `obj-000`, `obj-001`, ...
    pub fn catalog_entries(count: usize) -> Vec<CatalogEntry> {
        (0..count)
            .map(|i| catalog_entry(&format!("obj-{:03}", i)))
            .collect()
    }

    /// Create an unsaved store at `{dir}/manifest.json` holding `records`.
    pub fn store_with(dir: &Path, records: Vec<ObjectRecord>) -> ManifestStore {
        let mut store = match ManifestStore::load(dir.join("manifest.json")) {
            Ok(store) => store,
            Err(e) => panic!("failed to open fixture manifest: {}", e),
        };
        for record in records {
            store.put(record);
        }
        store
    }
}
