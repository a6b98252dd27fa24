//! Source catalogs: where the download stage learns which objects exist.
//!
//! A catalog yields [`CatalogEntry`] values carrying an explicit provenance
//! tag. The directory scan in [`scan`] is the reverse direction: it rebuilds
//! manifest records from files already sitting in the download directory.

mod jsonl;
pub mod scan;
mod types;

pub use jsonl::JsonLinesCatalog;
pub use scan::scan_download_dir;
pub use types::{CatalogEntry, CatalogError, SourceCatalog, StaticCatalog};
