//! CLI output formatting and display helpers.

use std::collections::BTreeMap;
use std::path::Path;

use offliner_core::{OutcomeStatus, RepositoryResolver, RunSummary, TargetSet};

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub(crate) fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub(crate) fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// One line per planned target followed by its candidate repositories.
pub(crate) fn render_dry_run_lines(
    targets: &TargetSet,
    resolver: &RepositoryResolver,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(targets.len() * 2 + 1);
    for target in targets {
        let requirement = if target.is_required() {
            "required"
        } else {
            "optional"
        };
        lines.push(format!("{} ({requirement})", target.path()));
        let mut any = false;
        for repository in resolver.candidates(target.repositories()) {
            any = true;
            lines.push(format!("  <- {repository}"));
        }
        if !any {
            lines.push("  <- (no repositories)".to_string());
        }
    }
    lines.push(format!("{} targets planned", targets.len()));
    lines
}

/// Summary lines printed once a run finishes.
pub(crate) fn render_completion_lines(
    summary: &RunSummary,
    mirror_dir: &Path,
    width: usize,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Mirrored {} files into {} ({} retries, {} optional files absent)",
        summary.downloaded,
        mirror_dir.display(),
        summary.retried,
        summary.absent
    )];
    if summary.interrupted {
        lines.push(format!(
            "Interrupted: {} targets were not started. Run again to finish.",
            summary.cancelled
        ));
    }
    for issue in &summary.descriptor_issues {
        lines.push(truncate_to_width(
            &format!("Input issue in {}: {}", issue.location.display(), issue.message),
            width,
        ));
    }
    lines.extend(render_failure_summary_lines(summary, width));
    lines
}

/// Failures grouped by status, each group listing its paths.
pub(crate) fn render_failure_summary_lines(summary: &RunSummary, width: usize) -> Vec<String> {
    if summary.failures.is_empty() {
        return Vec::new();
    }

    let mut grouped: BTreeMap<OutcomeStatus, Vec<&str>> = BTreeMap::new();
    for failure in &summary.failures {
        grouped
            .entry(failure.status)
            .or_default()
            .push(failure.path.as_str());
    }

    let mut lines = vec![truncate_to_width("Failure summary by status:", width)];
    for (status, paths) in &grouped {
        lines.push(format!("- {status}: {}", paths.len()));
        lines.push(truncate_to_width(
            &format!("  Fix: {}", failure_hint(*status)),
            width,
        ));
        for path in paths {
            lines.push(truncate_to_width(&format!("  {path}"), width));
        }
    }
    lines
}

fn failure_hint(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::NotFoundAnywhere => {
            "check the coordinate or add a repository that publishes it (-r)"
        }
        OutcomeStatus::ChecksumMismatch => {
            "the file was kept; compare it with the repository or delete it and rerun"
        }
        OutcomeStatus::TransportError => {
            "the repository was unreachable; rerun later or raise --max-attempts"
        }
        OutcomeStatus::IoError => "check permissions and free space in the mirror directory",
        OutcomeStatus::TaskFailed => "rerun with -vv and report the log",
        OutcomeStatus::Succeeded | OutcomeStatus::Absent => "none",
    }
}
