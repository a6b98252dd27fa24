//! Plain-text run reports.

use std::fmt::Write;

use viewforge_core::{ManifestStats, RunSummary};

/// Selected ids listed by a dry run before the rest are summarized.
const DRY_RUN_PREVIEW: usize = 10;

/// Manifest counts, followed by one line per source when any are known.
pub fn format_stats(stats: &ManifestStats) -> String {
    let mut out = format!(
        "Manifest: {} objects | downloaded {} (failed {}, pending {}) | rendered {} (failed {}, pending {})",
        stats.total,
        stats.downloaded,
        stats.download_failed,
        stats.download_pending,
        stats.rendered,
        stats.render_failed,
        stats.render_pending,
    );
    for (source, count) in &stats.by_source {
        let _ = write!(out, "\n  {}: {}", source, count);
    }
    out
}

/// End-of-run report for a batch.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.dry_run {
        let _ = writeln!(
            out,
            "Dry run: {} objects selected for {}",
            summary.selected.len(),
            summary.kind
        );
        for id in summary.selected.iter().take(DRY_RUN_PREVIEW) {
            let _ = writeln!(out, "  {}", id);
        }
        if summary.selected.len() > DRY_RUN_PREVIEW {
            let _ = writeln!(
                out,
                "  ... and {} more",
                summary.selected.len() - DRY_RUN_PREVIEW
            );
        }
        out.push_str(&format_stats(&summary.stats));
        return out;
    }

    let _ = writeln!(out, "{} summary", capitalize(summary.kind.as_str()));
    let _ = writeln!(out, "  attempted: {}", summary.attempted);
    let _ = writeln!(
        out,
        "  succeeded: {} ({} already done)",
        summary.succeeded, summary.skipped
    );
    let _ = writeln!(out, "  failed:    {}", summary.failed);
    if let Some(avg) = summary.average_task_seconds {
        let _ = writeln!(out, "  avg time:  {:.2}s", avg);
    }
    let _ = writeln!(out, "  elapsed:   {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "  sample failures:");
        for failure in &summary.failures {
            let _ = writeln!(
                out,
                "    {} [{}]: {}",
                failure.object_id, failure.kind, failure.message
            );
        }
    }

    out.push_str(&format_stats(&summary.stats));
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use viewforge_core::orchestrator::FailureSample;
    use viewforge_core::{FailureKind, TaskKind};

    fn summary(dry_run: bool) -> RunSummary {
        RunSummary {
            kind: TaskKind::Render,
            dry_run,
            selected: vec!["a".to_string(), "b".to_string()],
            attempted: 2,
            succeeded: 1,
            failed: 1,
            skipped: 0,
            failures: vec![FailureSample {
                object_id: "b".to_string(),
                kind: FailureKind::Incomplete,
                message: "Only 4/6 views created".to_string(),
            }],
            average_task_seconds: Some(2.5),
            elapsed: Duration::from_secs(3),
            stats: ManifestStats {
                total: 2,
                downloaded: 2,
                rendered: 1,
                render_failed: 1,
                by_source: [("github".to_string(), 2)].into_iter().collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_format_summary() {
        let out = format_summary(&summary(false));
        assert!(out.starts_with("Render summary\n"));
        assert!(out.contains("  failed:    1"));
        assert!(out.contains("  avg time:  2.50s"));
        assert!(out.contains("    b [incomplete]: Only 4/6 views created"));
        assert!(out.contains("rendered 1 (failed 1, pending 0)\n  github: 2"));
    }

    #[test]
    fn test_format_dry_run_lists_ids() {
        let out = format_summary(&summary(true));
        assert!(out.starts_with("Dry run: 2 objects selected for render\n  a\n  b\n"));
        assert!(!out.contains("failed:"));
        assert!(!out.contains("more"));
    }

    #[test]
    fn test_dry_run_listing_is_capped() {
        let mut summary = summary(true);
        summary.selected = (0..25).map(|i| format!("obj-{:03}", i)).collect();

        let out = format_summary(&summary);
        assert!(out.contains("  obj-009\n  ... and 15 more\n"));
        assert!(!out.contains("obj-010"));
    }

    #[test]
    fn test_format_stats_lists_sources() {
        let stats = ManifestStats {
            total: 3,
            downloaded: 3,
            render_pending: 3,
            by_source: [
                ("github".to_string(), 2),
                ("smithsonian".to_string(), 1),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let out = format_stats(&stats);
        assert!(out.starts_with("Manifest: 3 objects | downloaded 3"));
        assert!(out.ends_with("\n  github: 2\n  smithsonian: 1"));
    }
}
