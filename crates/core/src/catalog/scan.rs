//! Reconciliation scan of the download directory.
//!
//! Rebuilds manifest records for files that are on disk but not in the
//! manifest (for example after a manifest was lost, or files were fetched by
//! another tool). Provenance comes from the directory layout the download
//! stage writes, `{download_dir}/{source}/{id}.{ext}`.

use std::path::{Component, Path};

use tracing::debug;
use walkdir::WalkDir;

use super::types::{is_safe_id, CatalogError};
use crate::manifest::{ObjectRecord, Status};

/// Source tag for files found directly under the download directory.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Walks `dir` and returns a downloaded record for every file with one of `extensions`.
///
/// Records come back in file-name order. Extensions are compared case-insensitively.
pub fn scan_download_dir(
    dir: &Path,
    extensions: &[String],
) -> Result<Vec<ObjectRecord>, CatalogError> {
    let mut records = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CatalogError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_safe_id(id) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };

        let local_path = to_slash(relative);
        let source = source_of(relative);

        let mut record = ObjectRecord::new(
            id,
            format!("file://{local_path}"),
            local_path,
            ext,
            source,
        );
        record.download_status = Status::Success;
        records.push(record);
    }

    debug!(dir = %dir.display(), found = records.len(), "Scanned download directory");
    Ok(records)
}

fn source_of(relative: &Path) -> String {
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(first)), Some(_)) => first.to_string_lossy().into_owned(),
        _ => UNKNOWN_SOURCE.to_string(),
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
