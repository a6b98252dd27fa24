//! Error types for the manifest module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or saving the manifest.
///
/// All of these are fatal to a run: a manifest that cannot be read must never
/// be replaced by an empty one, and a manifest that cannot be written means
/// progress is not being recorded.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file exists but does not parse.
    #[error("corrupt manifest at {path}: {reason}")]
    CorruptManifest { path: PathBuf, reason: String },

    /// The manifest declares a schema this build cannot read.
    #[error("unsupported manifest version {found} (expected {expected}.x)")]
    UnsupportedVersion { found: String, expected: String },

    /// Filesystem error while reading or writing the manifest.
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of the in-memory manifest failed.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
