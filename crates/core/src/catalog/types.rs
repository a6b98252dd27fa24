//! Catalog types and the source catalog trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::ObjectRecord;

/// Errors raised while reading a source catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file does not exist.
    #[error("catalog not found: {0}")]
    NotFound(String),

    /// A catalog line could not be parsed.
    #[error("invalid catalog entry at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// An object id cannot be used as a path component.
    #[error("invalid object id {id:?}")]
    InvalidId { id: String },

    /// I/O error while reading the catalog or scanning a directory.
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One object advertised by an upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(alias = "url")]
    pub source_url: String,
    /// File extension without the dot; inferred from the URL when absent.
    #[serde(default)]
    pub file_type: String,
    /// Provenance tag, e.g. `smithsonian` or `objaverse-plusplus`.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default, alias = "sha256")]
    pub content_hash: String,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl CatalogEntry {
    /// Creates an entry with file type inferred from the URL.
    pub fn new(
        id: impl Into<String>,
        source_url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let mut entry = Self {
            id: id.into(),
            source_url: source_url.into(),
            file_type: String::new(),
            source: source.into(),
            license: None,
            content_hash: String::new(),
        };
        entry.normalize();
        entry
    }

    /// Fills in the file type from the URL if missing and lowercases it.
    pub fn normalize(&mut self) {
        if self.file_type.is_empty() {
            self.file_type = extension_from_url(&self.source_url).unwrap_or_else(|| "bin".into());
        }
        self.file_type = self.file_type.trim_start_matches('.').to_ascii_lowercase();
    }

    /// Rejects ids that cannot safely name a file or directory.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if is_safe_id(&self.id) && is_safe_id(&self.source) {
            Ok(())
        } else {
            Err(CatalogError::InvalidId {
                id: self.id.clone(),
            })
        }
    }

    /// Download location relative to the download directory: `{source}/{id}.{file_type}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}.{}", self.source, self.id, self.file_type)
    }

    /// Builds a pending manifest record for this entry.
    pub fn to_record(&self) -> ObjectRecord {
        let mut record = ObjectRecord::new(
            &self.id,
            &self.source_url,
            self.relative_path(),
            &self.file_type,
            &self.source,
        )
        .with_content_hash(&self.content_hash);
        record.license = self.license.clone();
        record
    }
}

/// Whether `id` can be used as a single path component.
pub(crate) fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// A source of downloadable objects.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Returns the name of this catalog implementation.
    fn name(&self) -> &str;

    /// Returns every entry the catalog currently advertises, in catalog order.
    async fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    /// Creates a catalog serving the given entries.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl SourceCatalog for StaticCatalog {
    fn name(&self) -> &str {
        "static"
    }

    async fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        for entry in &self.entries {
            entry.validate()?;
        }
        Ok(self.entries.clone())
    }
}
