//! Engine settings.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SyncError};
use crate::labels::TrackedLabels;
use crate::links::LinkPolicy;
use crate::paginate::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use crate::query::{ScopeSelector, labeled_issues_jql};

/// Largest page size the search endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// What happens to tracked labels on issues whose status is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredStatusPolicy {
    /// Leave such issues exactly as they are: never labeled, never cleaned up.
    #[default]
    Freeze,
    /// Strip every tracked label from such issues.
    Cleanup,
}

impl IgnoredStatusPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for IgnoredStatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IgnoredStatusPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "freeze" => Ok(Self::Freeze),
            "cleanup" => Ok(Self::Cleanup),
            other => Err(SyncError::validation(
                "ignored_status_policy",
                format!("'{other}' is not one of: freeze, cleanup"),
            )),
        }
    }
}

/// Everything the engine reads from configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSettings {
    pub scope: ScopeSelector,
    /// Issue types admitted to the core scope. Empty admits every type.
    pub core_issue_types: Vec<String>,
    pub ignored_statuses: Vec<String>,
    pub labels: TrackedLabels,
    pub links: LinkPolicy,
    pub page_size: u32,
    pub max_pages: u32,
    pub ignored_status_policy: IgnoredStatusPolicy,
}

impl SyncSettings {
    /// Settings with default link policy, paging and status policy.
    #[must_use]
    pub fn new(scope: ScopeSelector, labels: TrackedLabels) -> Self {
        Self {
            scope,
            core_issue_types: Vec::new(),
            ignored_statuses: Vec::new(),
            labels,
            links: LinkPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            ignored_status_policy: IgnoredStatusPolicy::default(),
        }
    }

    /// Check numeric bounds.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the first out-of-range setting.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::validation(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size),
            ));
        }
        if self.max_pages == 0 {
            return Err(SyncError::validation("max_pages", "must be at least 1"));
        }
        Ok(())
    }

    /// Case-insensitive membership in the ignored status list.
    #[must_use]
    pub fn is_ignored_status(&self, status: &str) -> bool {
        let status = status.trim().to_lowercase();
        self.ignored_statuses
            .iter()
            .any(|ignored| ignored.trim().to_lowercase() == status)
    }

    /// Case-insensitive membership in the core issue type list.
    #[must_use]
    pub fn is_core_issue_type(&self, issue_type: &str) -> bool {
        if self.core_issue_types.is_empty() {
            return true;
        }
        let issue_type = issue_type.trim().to_lowercase();
        self.core_issue_types
            .iter()
            .any(|allowed| allowed.trim().to_lowercase() == issue_type)
    }

    /// JQL for the labeled scope, honouring the ignored status policy.
    #[must_use]
    pub fn labeled_scope_jql(&self) -> String {
        match self.ignored_status_policy {
            IgnoredStatusPolicy::Freeze => labeled_issues_jql(&self.labels, &self.ignored_statuses),
            IgnoredStatusPolicy::Cleanup => labeled_issues_jql(&self.labels, &[]),
        }
    }
}
