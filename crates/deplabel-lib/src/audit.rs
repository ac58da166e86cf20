//! Audit records for executed runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::apply::{AppliedChange, ApplyFailure, ApplyMode, ApplyReport};
use crate::error::Result;
use crate::paginate::PaginationSummary;
use crate::plan::RunStats;
use crate::settings::SyncSettings;

/// Endpoint and scope configuration recorded with every audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditContext {
    pub jira_base_url: String,
    pub core_filter_id: Option<String>,
    pub core_jql: Option<String>,
    pub dependency_label: String,
    pub dependency_label_aliases: Vec<String>,
}

impl AuditContext {
    #[must_use]
    pub fn new(base_url: impl Into<String>, settings: &SyncSettings) -> Self {
        Self {
            jira_base_url: base_url.into(),
            core_filter_id: settings.scope.filter_id().map(ToString::to_string),
            core_jql: settings.scope.literal_query().map(ToString::to_string),
            dependency_label: settings.labels.canonical().as_str().to_string(),
            dependency_label_aliases: settings
                .labels
                .aliases()
                .iter()
                .map(|alias| alias.as_str().to_string())
                .collect(),
        }
    }
}

/// Everything an executed run changed, as written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    pub mode: ApplyMode,
    #[serde(flatten)]
    pub context: AuditContext,
    pub summary: RunStats,
    pub pagination: PaginationSummary,
    pub changes: Vec<AppliedChange>,
    pub failures: Vec<ApplyFailure>,
}

impl AuditRecord {
    /// Build the record for an executed run. Previews produce no audit.
    #[must_use]
    pub fn from_report(
        context: AuditContext,
        report: &ApplyReport,
        pagination: PaginationSummary,
        generated_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !report.mode.is_execute() {
            return None;
        }
        Some(Self {
            run_id: generated_at.format("%Y%m%dT%H%M%SZ").to_string(),
            generated_at_utc: generated_at,
            mode: report.mode,
            context,
            summary: report.stats,
            pagination,
            changes: report.applied.clone(),
            failures: report.failures.clone(),
        })
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("label_sync_audit_{}.json", self.run_id)
    }

    /// Write pretty JSON into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` if the file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "Wrote audit file");
        Ok(path)
    }
}
