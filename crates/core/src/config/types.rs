use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Manifest location and checkpoint cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: PathBuf,
    /// Flush the manifest after this many applied task results.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("data/objects/manifest.json")
}

fn default_checkpoint_every() -> usize {
    10
}

/// Download stage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Root directory downloads are written under.
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
    /// JSON-lines source catalog.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Timeout for a single download in seconds (default: 300)
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
    /// Concurrent downloads (default: available parallelism)
    #[serde(default = "default_download_workers")]
    pub workers: usize,
    /// File extensions picked up by the directory scan.
    #[serde(default = "default_extensions")]
    pub supported_extensions: Vec<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
            catalog: None,
            timeout_secs: default_download_timeout(),
            workers: default_download_workers(),
            supported_extensions: default_extensions(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/objects")
}

fn default_download_timeout() -> u64 {
    300
}

fn default_download_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_extensions() -> Vec<String> {
    ["glb", "gltf", "obj", "fbx", "ply", "blend", "stl"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Render stage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Root directory renders are written under, one subdirectory per object.
    #[serde(default = "default_render_dir")]
    pub output_dir: PathBuf,
    /// Render program (Blender binary).
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Script passed to the render program with `--python`.
    #[serde(default = "default_script")]
    pub script: PathBuf,
    /// Extra arguments appended after the script's own arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Timeout for a single render in seconds (default: 60)
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
    /// Concurrent renders (default: 4)
    #[serde(default = "default_render_workers")]
    pub workers: usize,
    /// Views rendered per object (default: 6)
    #[serde(default = "default_view_count")]
    pub view_count: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_render_dir(),
            program: default_program(),
            script: default_script(),
            extra_args: Vec::new(),
            timeout_secs: default_render_timeout(),
            workers: default_render_workers(),
            view_count: default_view_count(),
        }
    }
}

fn default_render_dir() -> PathBuf {
    PathBuf::from("renders")
}

fn default_program() -> PathBuf {
    PathBuf::from("blender")
}

fn default_script() -> PathBuf {
    PathBuf::from("scripts/render_objects.py")
}

fn default_render_timeout() -> u64 {
    60
}

fn default_render_workers() -> usize {
    4
}

fn default_view_count() -> usize {
    6
}

/// Retry policy for previously failed objects
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Stop re-selecting a failed object once it has this many attempts (0 = unbounded).
    #[serde(default)]
    pub max_attempts: u32,
}
