//! Sync command implementation.
//!
//! Resolves both scopes, plans the label changes, previews or applies them,
//! writes the audit file when applying, and prints the summary.

use anyhow::{Result, bail};
use chrono::Utc;
use std::path::{Path, PathBuf};

use deplabel_lib::{
    ApplyMode, ApplyReport, AuditContext, AuditRecord, IssueTracker, PaginationSummary, Reconciler,
};

use super::{connect, load_config};
use crate::cli::{GlobalOpts, SyncArgs};
use crate::config::AppConfig;
use crate::format::{
    SyncReport, format_change_line, format_diagnostics_line, format_failure_line, format_summary,
};

/// Everything one run produced.
#[derive(Debug)]
pub struct SyncOutcome {
    pub report: ApplyReport,
    pub pagination: PaginationSummary,
    pub audit_path: Option<PathBuf>,
}

/// Plan and preview or apply against `tracker`, writing the audit file in
/// apply mode.
///
/// # Errors
///
/// Returns an error if settings are invalid, a search or lookup fails, or the
/// audit file cannot be written. Per-issue update failures are not errors;
/// they are in `report.failures`.
pub fn run_sync<T: IssueTracker + ?Sized>(
    tracker: &T,
    config: &AppConfig,
    mode: ApplyMode,
    audit_dir: &Path,
) -> deplabel_lib::Result<SyncOutcome> {
    let mut reconciler = Reconciler::new(tracker, &config.sync);
    let plan = reconciler.build_plan()?;
    for diagnostics in reconciler.diagnostics() {
        tracing::debug!("{}", format_diagnostics_line(diagnostics));
    }

    let report = reconciler.apply_plan(&plan, mode);
    let pagination = reconciler.pagination_summary();

    let context = AuditContext::new(config.jira.base_url_str(), &config.sync);
    let audit_path = match AuditRecord::from_report(context, &report, pagination, Utc::now()) {
        Some(record) => Some(record.write_to_dir(audit_dir)?),
        None => None,
    };

    Ok(SyncOutcome {
        report,
        pagination,
        audit_path,
    })
}

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if configuration or Jira access fails, or if any label
/// update was rejected (after the summary has been printed).
pub fn execute(args: &SyncArgs, opts: &GlobalOpts) -> Result<()> {
    let (layers, config) = load_config(opts)?;
    let client = connect(&config, &layers)?;
    let mode = ApplyMode::from_execute(args.apply);
    let audit_dir = args.audit_dir.clone().unwrap_or_else(|| config.audit_dir.clone());

    let outcome = run_sync(&client, &config, mode, &audit_dir)?;
    print_outcome(&outcome, opts)?;

    let failed = outcome.report.failures.len();
    if failed > 0 {
        bail!("{failed} label update(s) failed");
    }
    Ok(())
}

fn print_outcome(outcome: &SyncOutcome, opts: &GlobalOpts) -> Result<()> {
    let report = &outcome.report;
    if opts.json {
        let json = SyncReport::new(report, outcome.pagination, outcome.audit_path.clone());
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for change in &report.applied {
        println!("{}", format_change_line(report.mode, change, opts.verbose > 0));
    }
    for failure in &report.failures {
        println!("{}", format_failure_line(failure));
    }
    if let Some(path) = &outcome.audit_path {
        println!("Audit log: {}", path.display());
    }
    println!("{}", format_summary(report.mode, &report.stats, &outcome.pagination));
    Ok(())
}
