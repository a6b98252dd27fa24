//! Blender-based renderer implementation.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::error::RenderError;
use super::traits::Renderer;
use super::types::RenderJob;
use crate::config::RenderConfig;

/// Number of trailing stderr lines kept in a process failure.
const STDERR_TAIL_LINES: usize = 5;

/// Runs Blender in background mode with a render script.
///
/// The script receives `--input <model> --output_dir <dir>` after the `--`
/// separator and is expected to write `{id}_view_{i}.png` files (plus
/// optional `{id}_view_{i}_mask*.png`) into the output directory.
#[derive(Debug, Clone)]
pub struct BlenderRenderer {
    program: PathBuf,
    script: PathBuf,
    extra_args: Vec<String>,
}

impl BlenderRenderer {
    /// Creates a renderer for the given program and script.
    pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            extra_args: Vec::new(),
        }
    }

    /// Creates a renderer from the `[render]` config section.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(&config.program, &config.script).with_extra_args(config.extra_args.clone())
    }

    /// Sets additional arguments appended after the script arguments.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Builds the command-line arguments for a job.
    fn build_args(&self, job: &RenderJob) -> Vec<String> {
        let mut args = vec![
            "--background".to_string(),
            "--python".to_string(),
            self.script.to_string_lossy().to_string(),
            "--".to_string(),
            "--input".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "--output_dir".to_string(),
            job.output_dir.to_string_lossy().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn not_found_or_io(&self, e: std::io::Error) -> RenderError {
        if e.kind() == std::io::ErrorKind::NotFound {
            RenderError::RendererNotFound {
                path: self.program.clone(),
            }
        } else {
            RenderError::Io(e)
        }
    }
}

/// Keeps the last few non-empty lines of process output.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl Renderer for BlenderRenderer {
    fn name(&self) -> &str {
        "blender"
    }

    async fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(RenderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let args = self.build_args(job);
        debug!(object_id = %job.object_id, program = %self.program.display(), "Starting render");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.not_found_or_io(e))?;

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let tail = stderr_tail(&output.stderr);
            return Err(RenderError::process_failed(
                output.status.code(),
                if tail.is_empty() {
                    "no error output".to_string()
                } else {
                    tail
                },
            ));
        }

        Ok(())
    }

    async fn validate(&self) -> Result<(), RenderError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.not_found_or_io(e))?;

        if !output.status.success() {
            return Err(RenderError::process_failed(
                output.status.code(),
                stderr_tail(&output.stderr),
            ));
        }

        if !tokio::fs::try_exists(&self.script).await.unwrap_or(false) {
            return Err(RenderError::InputNotFound {
                path: self.script.clone(),
            });
        }

        Ok(())
    }
}
