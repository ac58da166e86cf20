use serde::Serialize;
use std::path::PathBuf;

use deplabel_lib::links::LinkMatchMode;
use deplabel_lib::{
    AppliedChange, ApplyFailure, ApplyMode, ApplyReport, IgnoredStatusPolicy,
    PaginationDiagnostics, PaginationStyle, PaginationSummary, ResolvedScope, RunStats,
    ScopeSelector,
};

use crate::config::{AppConfig, ConfigLayers};

/// Result of one `sync` run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: ApplyMode,
    pub summary: RunStats,
    pub pagination: PaginationSummary,
    pub changes: Vec<AppliedChange>,
    pub failures: Vec<ApplyFailure>,
    pub audit_file: Option<PathBuf>,
}

impl SyncReport {
    #[must_use]
    pub fn new(report: &ApplyReport, pagination: PaginationSummary, audit_file: Option<PathBuf>) -> Self {
        Self {
            mode: report.mode,
            summary: report.stats,
            pagination,
            changes: report.applied.clone(),
            failures: report.failures.clone(),
            audit_file,
        }
    }
}

/// Result of the `scope` command.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeReport {
    pub core_count: usize,
    pub labeled_count: usize,
    pub core_keys: Vec<String>,
    pub labeled_keys: Vec<String>,
    pub queries: Vec<PaginationDiagnostics>,
    pub pagination: PaginationSummary,
}

impl From<&ResolvedScope> for ScopeReport {
    fn from(scope: &ResolvedScope) -> Self {
        let mut labeled_keys: Vec<String> = scope
            .labeled_issues
            .iter()
            .map(|issue| issue.key.clone())
            .collect();
        labeled_keys.sort();
        Self {
            core_count: scope.core_keys.len(),
            labeled_count: labeled_keys.len(),
            core_keys: scope.core_keys.iter().cloned().collect(),
            labeled_keys,
            queries: scope.diagnostics.clone(),
            pagination: scope.pagination_summary(),
        }
    }
}

/// Resolved configuration. Never carries the token itself.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigView {
    pub jira_base_url: String,
    pub pagination_style: PaginationStyle,
    pub auth_mode: String,
    pub token_env_var: String,
    pub email_env_var: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub scope: ScopeSelector,
    pub core_jql: String,
    pub dependency_label: String,
    pub dependency_label_aliases: Vec<String>,
    pub core_issue_types: Vec<String>,
    pub ignored_statuses: Vec<String>,
    pub ignored_status_policy: IgnoredStatusPolicy,
    pub link_match_mode: LinkMatchMode,
    pub link_type_ids: Vec<String>,
    pub link_names: Vec<String>,
    pub link_directions: Vec<String>,
    pub ignored_link_type_ids: Vec<String>,
    pub ignored_link_names: Vec<String>,
    pub labeled_scope_jql: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub audit_dir: PathBuf,
    pub sources: Vec<String>,
}

impl ConfigView {
    #[must_use]
    pub fn new(config: &AppConfig, layers: &ConfigLayers) -> Self {
        let jira = &config.jira;
        let sync = &config.sync;
        let links = &sync.links;
        Self {
            jira_base_url: jira.base_url_str(),
            pagination_style: PaginationStyle::for_host(jira.host()),
            auth_mode: format!("{} ({})", jira.auth_mode, jira.auth_mode.resolve(jira.host())),
            token_env_var: jira.token_env_var.clone(),
            email_env_var: jira.email_env_var.clone(),
            request_timeout_seconds: jira.request_timeout.as_secs(),
            max_retries: jira.max_retries,
            scope: sync.scope.clone(),
            core_jql: sync.scope.to_jql(),
            dependency_label: sync.labels.canonical().to_string(),
            dependency_label_aliases: sync.labels.aliases().iter().map(ToString::to_string).collect(),
            core_issue_types: sync.core_issue_types.clone(),
            ignored_statuses: sync.ignored_statuses.clone(),
            ignored_status_policy: sync.ignored_status_policy,
            link_match_mode: links.mode(),
            link_type_ids: links.allowed_type_ids().to_vec(),
            link_names: links.allowed_names().iter().cloned().collect(),
            link_directions: links
                .allowed_directions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            ignored_link_type_ids: links.ignored_type_ids().iter().cloned().collect(),
            ignored_link_names: links.ignored_names().iter().cloned().collect(),
            labeled_scope_jql: sync.labeled_scope_jql(),
            page_size: sync.page_size,
            max_pages: sync.max_pages,
            audit_dir: config.audit_dir.clone(),
            sources: layers.sources().map(ToString::to_string).collect(),
        }
    }
}
