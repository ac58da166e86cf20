//! Text formatting functions for `deplabel`.
//!
//! Plain text (non-ANSI) formatting for terminal output:
//! - Per-issue change lines (`DRY-RUN: EXT-1: add X; remove Y`)
//! - The run summary block
//! - Pagination diagnostics, scope and configuration listings

use std::fmt::Write;

use deplabel_lib::{
    AppliedChange, ApplyFailure, ApplyMode, PaginationDiagnostics, PaginationSummary, RunStats,
};

use super::output::{ConfigView, ScopeReport};

/// Format one previewed or applied change.
///
/// Format: `{mode}: {key}: add X; remove Y`, followed by one indented line per
/// reason when `with_reasons` is set.
#[must_use]
pub fn format_change_line(mode: ApplyMode, change: &AppliedChange, with_reasons: bool) -> String {
    let mut line = format!("{}: {}: {}", mode.label(), change.issue_key, change.action_text());
    if with_reasons {
        for reason in &change.reasons {
            let _ = write!(line, "\n    - {reason}");
        }
    }
    line
}

/// Format: `FAILED: {key}: {error}`
#[must_use]
pub fn format_failure_line(failure: &ApplyFailure) -> String {
    format!("FAILED: {}: {}", failure.issue_key, failure.error)
}

/// The end-of-run summary block.
#[must_use]
pub fn format_summary(mode: ApplyMode, stats: &RunStats, pagination: &PaginationSummary) -> String {
    let mut out = String::from("----- SUMMARY -----\n");
    let _ = writeln!(out, "Issues scanned: {}", stats.issues_scanned);
    let _ = writeln!(out, "Dependencies found: {}", stats.dependencies_found);
    let _ = writeln!(out, "Labels added: {}", stats.labels_added);
    let _ = writeln!(out, "Labels removed: {}", stats.labels_removed);
    let _ = writeln!(out, "Search queries executed: {}", pagination.queries_executed);
    let _ = writeln!(out, "Search pages fetched: {}", pagination.pages_fetched);
    let _ = writeln!(out, "Search issues fetched: {}", pagination.issues_fetched);
    if pagination.duplicates_dropped > 0 {
        let _ = writeln!(out, "Duplicate issues dropped: {}", pagination.duplicates_dropped);
    }
    let _ = writeln!(out, "Pagination mismatches: {}", pagination.reported_total_mismatches);
    let _ = write!(out, "Mode: {}", mode.label());
    out
}

/// One query's pagination diagnostics on a single line.
#[must_use]
pub fn format_diagnostics_line(diagnostics: &PaginationDiagnostics) -> String {
    let total = diagnostics
        .reported_total
        .map_or_else(|| "n/a".to_string(), |total| total.to_string());
    let mut line = format!(
        "[{}] {} page(s), {} issue(s), reported total {}, ended by {}: {}",
        diagnostics.style,
        diagnostics.pages_fetched,
        diagnostics.issues_fetched,
        total,
        diagnostics.ended_by,
        diagnostics.jql,
    );
    if diagnostics.duplicates_dropped > 0 {
        let _ = write!(line, " ({} duplicate(s) dropped)", diagnostics.duplicates_dropped);
    }
    if diagnostics.has_mismatch() {
        line.push_str(" [MISMATCH]");
    }
    line
}

fn key_list(keys: &[String]) -> String {
    if keys.is_empty() {
        "(none)".to_string()
    } else {
        keys.join(", ")
    }
}

/// Scope sizes, keys and query diagnostics.
#[must_use]
pub fn format_scope(report: &ScopeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Core issues ({}): {}", report.core_count, key_list(&report.core_keys));
    let _ = writeln!(
        out,
        "Labeled issues ({}): {}",
        report.labeled_count,
        key_list(&report.labeled_keys)
    );
    out.push_str("Queries:");
    for diagnostics in &report.queries {
        let _ = write!(out, "\n  {}", format_diagnostics_line(diagnostics));
    }
    out
}

/// Resolved configuration as `key: value` lines.
#[must_use]
pub fn format_config(view: &ConfigView) -> String {
    let rows: [(&str, String); 21] = [
        ("jira_base_url", view.jira_base_url.clone()),
        ("pagination_style", view.pagination_style.to_string()),
        ("auth_mode", view.auth_mode.clone()),
        ("token_env_var", view.token_env_var.clone()),
        ("email_env_var", view.email_env_var.clone()),
        ("request_timeout_seconds", view.request_timeout_seconds.to_string()),
        ("max_retries", view.max_retries.to_string()),
        ("core_scope", view.scope.to_string()),
        ("dependency_label", view.dependency_label.clone()),
        ("dependency_label_aliases", view.dependency_label_aliases.join(", ")),
        ("core_issue_types", view.core_issue_types.join(", ")),
        ("ignored_statuses", view.ignored_statuses.join(", ")),
        ("ignored_status_policy", view.ignored_status_policy.to_string()),
        ("link_type_ids", view.link_type_ids.join(", ")),
        ("link_names", view.link_names.join(", ")),
        ("link_directions", view.link_directions.join(", ")),
        ("ignored_link_type_ids", view.ignored_link_type_ids.join(", ")),
        ("ignored_link_names", view.ignored_link_names.join(", ")),
        ("page_size", view.page_size.to_string()),
        ("max_pages", view.max_pages.to_string()),
        ("audit_dir", view.audit_dir.display().to_string()),
    ];

    let mut out = String::new();
    for (key, value) in rows {
        let _ = writeln!(out, "{key}: {value}");
    }
    let _ = write!(out, "sources: {}", view.sources.join(" > "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplabel_lib::{EndedBy, PaginationStyle};

    fn change() -> AppliedChange {
        AppliedChange {
            issue_key: "EXT-1".into(),
            labels_added: vec!["DFS_CORE_Dependencies".into()],
            labels_removed: vec!["DFS_Old".into()],
            reasons: vec!["Authoritative dependency of core CORE-1".into()],
        }
    }

    #[test]
    fn test_change_line() {
        assert_eq!(
            format_change_line(ApplyMode::Preview, &change(), false),
            "DRY-RUN: EXT-1: add DFS_CORE_Dependencies; remove DFS_Old"
        );
        let verbose = format_change_line(ApplyMode::Execute, &change(), true);
        assert!(verbose.starts_with("APPLY: EXT-1:"));
        assert!(verbose.ends_with("\n    - Authoritative dependency of core CORE-1"));
    }

    #[test]
    fn test_summary_block() {
        let stats = RunStats {
            issues_scanned: 3,
            dependencies_found: 2,
            labels_added: 1,
            labels_removed: 1,
        };
        let pagination = PaginationSummary {
            queries_executed: 2,
            pages_fetched: 3,
            issues_fetched: 5,
            duplicates_dropped: 0,
            reported_total_mismatches: 1,
        };
        let summary = format_summary(ApplyMode::Preview, &stats, &pagination);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(
            lines,
            [
                "----- SUMMARY -----",
                "Issues scanned: 3",
                "Dependencies found: 2",
                "Labels added: 1",
                "Labels removed: 1",
                "Search queries executed: 2",
                "Search pages fetched: 3",
                "Search issues fetched: 5",
                "Pagination mismatches: 1",
                "Mode: DRY-RUN",
            ]
        );
    }

    #[test]
    fn test_diagnostics_line_flags_mismatch() {
        let diagnostics = PaginationDiagnostics {
            jql: "project = CORE".into(),
            style: PaginationStyle::Offset,
            pages_fetched: 2,
            issues_fetched: 150,
            duplicates_dropped: 0,
            reported_total: Some(151),
            ended_by: EndedBy::EmptyPage,
        };
        let line = format_diagnostics_line(&diagnostics);
        assert!(line.starts_with("[offset] 2 page(s), 150 issue(s), reported total 151"));
        assert!(line.ends_with("[MISMATCH]"));
    }

    #[test]
    fn test_failure_line() {
        let failure = ApplyFailure {
            issue_key: "EXT-9".into(),
            error: "update labels on EXT-9 failed with status 403: nope".into(),
        };
        assert_eq!(
            format_failure_line(&failure),
            "FAILED: EXT-9: update labels on EXT-9 failed with status 403: nope"
        );
    }
}
