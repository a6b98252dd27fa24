//! File-backed manifest store.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::ManifestError;
use super::types::{
    ManifestDocument, ManifestFilter, ManifestStats, ObjectRecord, SCHEMA_VERSION,
};

/// In-memory manifest backed by a single JSON file.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    document: ManifestDocument,
}

impl ManifestStore {
    /// Loads the manifest at `path`, or starts an empty one if the file does not exist.
    ///
    /// A file that exists but does not parse is reported as
    /// [`ManifestError::CorruptManifest`]; it is never replaced silently.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No manifest found, starting a new one");
                return Ok(Self {
                    path,
                    document: ManifestDocument::new(),
                });
            }
            Err(e) => return Err(ManifestError::io(&path, e)),
        };

        let mut document: ManifestDocument = serde_json::from_str(&raw)
            .map_err(|e| ManifestError::corrupt(&path, e.to_string()))?;
        check_version(&document.version)?;
        document.total_objects = document.objects.len();

        info!(
            path = %path.display(),
            objects = document.total_objects,
            version = %document.version,
            "Loaded manifest"
        );

        Ok(Self { path, document })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the manifest file.
    pub fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Schema version of the loaded document.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Creation timestamp of the document.
    pub fn created(&self) -> &str {
        &self.document.created
    }

    /// Writes the whole manifest to disk.
    ///
    /// The document is written to a temporary file in the same directory,
    /// synced, and then renamed over the target, so readers only ever see the
    /// previous snapshot or the new one in full.
    pub fn save(&self) -> Result<(), ManifestError> {
        let tmp = self.write_snapshot()?;

        tmp.persist(&self.path)
            .map_err(|e| ManifestError::io(&self.path, e.error))?;

        if let Ok(dir) = fs::File::open(self.dir()) {
            let _ = dir.sync_all();
        }

        debug!(
            path = %self.path.display(),
            objects = self.document.total_objects,
            "Saved manifest"
        );
        Ok(())
    }

    /// Writes and syncs the document into a temporary file beside the target.
    /// The file is removed if dropped before being persisted.
    fn write_snapshot(&self) -> Result<NamedTempFile, ManifestError> {
        let dir = self.dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| ManifestError::io(&dir, e))?;

        let tmp = NamedTempFile::new_in(&dir).map_err(|e| ManifestError::io(&dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.document)?;
            writer
                .flush()
                .map_err(|e| ManifestError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| ManifestError::io(tmp.path(), e))?;
        Ok(tmp)
    }

    /// Inserts or replaces the record for `item.id`.
    pub fn put(&mut self, item: ObjectRecord) {
        self.document.objects.insert(item.id.clone(), item);
        self.document.total_objects = self.document.objects.len();
    }

    /// Returns the record for `id`, or `None` if the manifest has no such object.
    pub fn get(&self, id: &str) -> Option<&ObjectRecord> {
        self.document.objects.get(id)
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.document.objects.contains_key(id)
    }

    /// Applies `f` to the record for `id`. Returns `false` if there is no such record.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut ObjectRecord)) -> bool {
        match self.document.objects.get_mut(id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Iterates over all records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.document.objects.values()
    }

    /// Lists records matching `filter`, in insertion order.
    pub fn list(&self, filter: &ManifestFilter) -> Vec<&ObjectRecord> {
        self.document
            .objects
            .values()
            .filter(|r| filter.matches(r))
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.document.objects.len()
    }

    /// Whether the manifest has no records.
    pub fn is_empty(&self) -> bool {
        self.document.objects.is_empty()
    }

    /// Counts records by status.
    pub fn stats(&self) -> ManifestStats {
        let mut stats = ManifestStats::default();
        for record in self.document.objects.values() {
            stats.record(record);
        }
        stats
    }

    /// Adds every item whose id is not yet present. Existing records are left untouched.
    ///
    /// Returns the number of records added.
    pub fn reconcile(&mut self, items: impl IntoIterator<Item = ObjectRecord>) -> usize {
        let mut added = 0;
        for item in items {
            if !self.contains(&item.id) {
                self.put(item);
                added += 1;
            }
        }
        added
    }
}

fn check_version(version: &str) -> Result<(), ManifestError> {
    let expected = major(SCHEMA_VERSION);
    if major(version) != expected {
        return Err(ManifestError::UnsupportedVersion {
            found: version.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
