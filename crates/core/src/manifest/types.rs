//! Core manifest data types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version written into new manifests.
pub const SCHEMA_VERSION: &str = "1.0";

/// Maximum length (in characters) of an error message persisted into the manifest.
pub const MAX_ERROR_LEN: usize = 200;

/// Lifecycle status of one axis (download or render) of an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Success,
    Failed,
}

impl Status {
    /// Returns the status as the string stored in the manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Success => "success",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered image of an object from a fixed viewpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// 0-based viewpoint index.
    #[serde(alias = "view_id")]
    pub view_index: u32,
    /// Image path relative to the render output root.
    pub image_path: String,
    /// Mask path relative to the render output root; empty when no mask was produced.
    #[serde(default)]
    pub mask_path: String,
}

/// Record for a single 3D object in the dataset.
///
/// Unknown fields found in the manifest are kept in `extra` and written back
/// on save, so a newer writer's additions survive a round-trip through this
/// build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(default)]
    pub source_url: String,
    /// Path of the downloaded file, relative to the download directory.
    #[serde(default)]
    pub local_path: String,
    #[serde(default)]
    pub file_type: String,
    /// Provenance tag (which upstream dataset the object came from).
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default, alias = "sha256")]
    pub content_hash: String,

    #[serde(default)]
    pub download_status: Status,
    #[serde(default)]
    pub download_error: Option<String>,
    #[serde(default)]
    pub render_status: Status,
    #[serde(default)]
    pub render_error: Option<String>,
    #[serde(default, alias = "render_time_sec")]
    pub render_duration_seconds: Option<f64>,
    #[serde(default)]
    pub views: Vec<View>,

    /// Number of download results applied to this record.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub download_attempts: u32,
    /// Number of render results applied to this record.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub render_attempts: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl ObjectRecord {
    /// Creates a record with both lifecycle axes pending.
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        local_path: impl Into<String>,
        file_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            local_path: local_path.into(),
            file_type: file_type.into(),
            source: source.into(),
            license: None,
            content_hash: String::new(),
            download_status: Status::Pending,
            download_error: None,
            render_status: Status::Pending,
            render_error: None,
            render_duration_seconds: None,
            views: Vec::new(),
            download_attempts: 0,
            render_attempts: 0,
            extra: Map::new(),
        }
    }

    /// Sets the license.
    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// Sets the content hash.
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }

    /// Sets the download status.
    pub fn with_download_status(mut self, status: Status) -> Self {
        self.download_status = status;
        self
    }

    /// Sets the render status.
    pub fn with_render_status(mut self, status: Status) -> Self {
        self.render_status = status;
        self
    }
}

/// The full on-disk manifest document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDocument {
    pub version: String,
    /// Creation timestamp, kept as written so foreign timestamp formats survive.
    pub created: String,
    /// Advisory count, recomputed on every mutation.
    #[serde(default)]
    pub total_objects: usize,
    #[serde(default)]
    pub objects: IndexMap<String, ObjectRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestDocument {
    /// Creates an empty document stamped with the current schema version and time.
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            created: Utc::now().to_rfc3339(),
            total_objects: 0,
            objects: IndexMap::new(),
            extra: Map::new(),
        }
    }
}

impl Default for ManifestDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter for listing manifest records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestFilter {
    pub download_status: Option<Status>,
    pub render_status: Option<Status>,
}

impl ManifestFilter {
    /// Creates a filter that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by download status.
    pub fn with_download_status(mut self, status: Status) -> Self {
        self.download_status = Some(status);
        self
    }

    /// Filter by render status.
    pub fn with_render_status(mut self, status: Status) -> Self {
        self.render_status = Some(status);
        self
    }

    /// Whether the record passes this filter.
    pub fn matches(&self, record: &ObjectRecord) -> bool {
        self.download_status
            .map_or(true, |s| record.download_status == s)
            && self.render_status.map_or(true, |s| record.render_status == s)
    }
}

/// Counts of objects by status, computed from the in-memory manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    pub total: usize,
    pub downloaded: usize,
    pub download_failed: usize,
    pub download_pending: usize,
    pub rendered: usize,
    pub render_failed: usize,
    pub render_pending: usize,
    /// Object count per provenance tag.
    #[serde(default)]
    pub by_source: BTreeMap<String, usize>,
}

impl ManifestStats {
    pub(crate) fn record(&mut self, record: &ObjectRecord) {
        self.total += 1;
        match record.download_status {
            Status::Success => self.downloaded += 1,
            Status::Failed => self.download_failed += 1,
            Status::Pending => self.download_pending += 1,
        }
        match record.render_status {
            Status::Success => self.rendered += 1,
            Status::Failed => self.render_failed += 1,
            Status::Pending => self.render_pending += 1,
        }
        *self.by_source.entry(record.source.clone()).or_default() += 1;
    }
}

/// Truncates a diagnostic message to [`MAX_ERROR_LEN`] characters.
pub fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(MAX_ERROR_LEN) {
        Some((idx, _)) => trimmed[..idx].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&Status::Success).unwrap(), "\"success\"");
        let parsed: Status = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, Status::Failed);
        assert_eq!(Status::Failed.to_string(), "failed");
    }

    #[test]
    fn test_record_reads_legacy_field_names() {
        let json = r#"{
            "id": "obj1",
            "source_url": "",
            "local_path": "objaverse_legacy/obj1.glb",
            "file_type": "glb",
            "source": "objaverse-plusplus",
            "license": "CC-BY",
            "sha256": "obj1",
            "download_status": "success",
            "download_error": null,
            "render_status": "success",
            "render_error": null,
            "render_time_sec": 12.5,
            "views": [{"view_id": 0, "image_path": "obj1/obj1_view_0.png", "mask_path": ""}]
        }"#;

        let record: ObjectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.content_hash, "obj1");
        assert_eq!(record.render_duration_seconds, Some(12.5));
        assert_eq!(record.views[0].view_index, 0);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_record_preserves_unknown_fields() {
        let json = r#"{
            "id": "obj2",
            "download_status": "pending",
            "quality_score": 3,
            "tags": ["chair"]
        }"#;

        let record: ObjectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.extra.get("quality_score"), Some(&Value::from(3)));

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["quality_score"], Value::from(3));
        assert_eq!(out["tags"][0], Value::from("chair"));
        assert_eq!(out["render_status"], Value::from("pending"));
        // attempt counters are omitted while zero
        assert!(out.get("render_attempts").is_none());
    }

    #[test]
    fn test_filter_matches() {
        let record = ObjectRecord::new("a", "", "a.glb", "glb", "github")
            .with_download_status(Status::Success);

        assert!(ManifestFilter::new().matches(&record));
        assert!(ManifestFilter::new()
            .with_download_status(Status::Success)
            .matches(&record));
        assert!(ManifestFilter::new()
            .with_download_status(Status::Success)
            .with_render_status(Status::Pending)
            .matches(&record));
        assert!(!ManifestFilter::new()
            .with_render_status(Status::Failed)
            .matches(&record));
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("  short  "), "short");

        let long = "x".repeat(MAX_ERROR_LEN + 50);
        assert_eq!(truncate_message(&long).len(), MAX_ERROR_LEN);

        // multi-byte characters are cut on a char boundary
        let wide = "é".repeat(MAX_ERROR_LEN + 1);
        assert_eq!(truncate_message(&wide).chars().count(), MAX_ERROR_LEN);
    }
}
