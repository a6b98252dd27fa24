//! Batch run options.

use crate::config::Config;

/// Options for one batch run.
///
/// Built from the `[download]` or `[render]` config section and then
/// overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Skip items already in a terminal state for the task's axis.
    pub resume: bool,

    /// With `resume`, also re-select failed items.
    pub retry_failed: bool,

    /// Cap on the number of selected items, applied after filtering.
    pub limit: Option<usize>,

    /// Maximum number of tasks running at once.
    pub workers: usize,

    /// List the selection without running anything.
    pub dry_run: bool,

    /// Flush the manifest after this many applied results.
    pub checkpoint_every: usize,

    /// Retry-failed only re-selects items with fewer attempts than this.
    /// 0 means unbounded.
    pub max_attempts: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            resume: false,
            retry_failed: false,
            limit: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            dry_run: false,
            checkpoint_every: 10,
            max_attempts: 0,
        }
    }
}

impl BatchOptions {
    /// Options for a download run.
    pub fn for_downloads(config: &Config) -> Self {
        Self {
            workers: config.download.workers,
            checkpoint_every: config.manifest.checkpoint_every,
            max_attempts: config.retry.max_attempts,
            ..Default::default()
        }
    }

    /// Options for a render run.
    pub fn for_renders(config: &Config) -> Self {
        Self {
            workers: config.render.workers,
            checkpoint_every: config.manifest.checkpoint_every,
            max_attempts: config.retry.max_attempts,
            ..Default::default()
        }
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    #[test]
    fn test_default_options() {
        let options = BatchOptions::default();
        assert!(!options.resume);
        assert!(!options.retry_failed);
        assert!(options.limit.is_none());
        assert!(options.workers >= 1);
        assert_eq!(options.checkpoint_every, 10);
        assert_eq!(options.max_attempts, 0);
    }

    #[test]
    fn test_from_config_sections() {
        let config = load_config_from_str(
            r#"
            [manifest]
            checkpoint_every = 25

            [download]
            workers = 16

            [render]
            workers = 2

            [retry]
            max_attempts = 3
        "#,
        )
        .unwrap();

        let downloads = BatchOptions::for_downloads(&config);
        assert_eq!(downloads.workers, 16);
        assert_eq!(downloads.checkpoint_every, 25);
        assert_eq!(downloads.max_attempts, 3);

        let renders = BatchOptions::for_renders(&config).with_resume(true).with_limit(5);
        assert_eq!(renders.workers, 2);
        assert!(renders.resume);
        assert_eq!(renders.limit, Some(5));
    }
}
