//! Persistent manifest of per-object download and render state.
//!
//! The manifest is a single JSON document loaded fully into memory by
//! [`ManifestStore::load`] and rewritten atomically by [`ManifestStore::save`].
//! The store has no internal locking: the batch orchestrator is its only
//! writer, and task executors hand their results back to it instead of
//! touching the store themselves.
//!
//! # Example
//!
//! ```ignore
//! use viewforge_core::manifest::{ManifestFilter, ManifestStore, ObjectRecord, Status};
//!
//! let mut store = ManifestStore::load("data/objects/manifest.json")?;
//! store.put(ObjectRecord::new("abc", "https://example.org/abc.glb", "github/abc.glb", "glb", "github"));
//!
//! let pending = store.list(&ManifestFilter::new().with_render_status(Status::Pending));
//! println!("{} objects waiting for render", pending.len());
//!
//! store.save()?;
//! ```

mod error;
mod store;
mod types;

pub use error::ManifestError;
pub use store::ManifestStore;
pub use types::{
    truncate_message, ManifestDocument, ManifestFilter, ManifestStats, ObjectRecord, Status, View,
    MAX_ERROR_LEN, SCHEMA_VERSION,
};
