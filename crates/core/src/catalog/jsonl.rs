//! JSON-lines catalog file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::types::{CatalogEntry, CatalogError, SourceCatalog};

/// Catalog backed by a file with one JSON object per line.
///
/// ```text
/// {"id": "8a1f", "source_url": "https://host/8a1f.glb", "source": "smithsonian", "license": "CC0"}
/// {"id": "c93e", "url": "https://host/c93e.obj", "source": "github"}
/// ```
#[derive(Debug, Clone)]
pub struct JsonLinesCatalog {
    path: PathBuf,
}

impl JsonLinesCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses catalog text. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut entry: CatalogEntry =
                serde_json::from_str(line).map_err(|e| CatalogError::Parse {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            entry.normalize();
            entry.validate()?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[async_trait]
impl SourceCatalog for JsonLinesCatalog {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CatalogError::NotFound(self.path.display().to_string())
            } else {
                CatalogError::Io(e)
            }
        })?;

        let entries = Self::parse(&text)?;
        debug!(path = %self.path.display(), entries = entries.len(), "Read catalog");
        Ok(entries)
    }
}
