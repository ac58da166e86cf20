//! Core and labeled scope resolution.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::Issue;
use crate::paginate::{PaginationDiagnostics, PaginationSummary, Paginator, SearchOutcome};
use crate::query::{CORE_FIELDS, LABELED_FIELDS};
use crate::settings::SyncSettings;
use crate::tracker::IssueTracker;

/// Both scopes for one run plus the diagnostics of the queries behind them.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    pub core_issues: Vec<Issue>,
    pub core_keys: BTreeSet<String>,
    pub labeled_issues: Vec<Issue>,
    pub diagnostics: Vec<PaginationDiagnostics>,
}

impl ResolvedScope {
    #[must_use]
    pub fn is_core(&self, key: &str) -> bool {
        self.core_keys.contains(key)
    }

    #[must_use]
    pub fn pagination_summary(&self) -> PaginationSummary {
        self.diagnostics.iter().collect()
    }
}

/// Runs the scope queries through the [`Paginator`].
pub struct ScopeResolver<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    settings: &'a SyncSettings,
}

impl<'a, T: IssueTracker + ?Sized> ScopeResolver<'a, T> {
    #[must_use]
    pub const fn new(tracker: &'a T, settings: &'a SyncSettings) -> Self {
        Self { tracker, settings }
    }

    fn paginator(&self) -> Paginator<'a, T> {
        Paginator::new(self.tracker, self.tracker.pagination_style())
            .with_page_size(self.settings.page_size)
            .with_max_pages(self.settings.max_pages)
    }

    /// Issues selected by the scope selector, restricted to allowed types and
    /// non-ignored statuses.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the search fails.
    pub fn load_core_scope(&self) -> Result<SearchOutcome> {
        let jql = self.settings.scope.to_jql();
        let mut outcome = self.paginator().fetch_all(&jql, CORE_FIELDS)?;

        let before = outcome.issues.len();
        outcome.issues.retain(|issue| {
            self.settings.is_core_issue_type(issue.issue_type_name())
                && !self.settings.is_ignored_status(issue.status_name())
        });
        tracing::info!(
            scope = %self.settings.scope,
            fetched = before,
            kept = outcome.issues.len(),
            "Loaded core scope"
        );

        Ok(outcome)
    }

    /// Issues currently carrying the canonical label or any alias.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the search fails.
    pub fn load_labeled_scope(&self) -> Result<SearchOutcome> {
        let jql = self.settings.labeled_scope_jql();
        let outcome = self.paginator().fetch_all(&jql, LABELED_FIELDS)?;
        tracing::info!(issues = outcome.issues.len(), "Loaded labeled scope");
        Ok(outcome)
    }

    /// Load both scopes.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if either search fails.
    pub fn resolve(&self) -> Result<ResolvedScope> {
        let core = self.load_core_scope()?;
        let labeled = self.load_labeled_scope()?;

        let core_keys = core.issues.iter().map(|issue| issue.key.clone()).collect();
        Ok(ResolvedScope {
            core_issues: core.issues,
            core_keys,
            labeled_issues: labeled.issues,
            diagnostics: vec![core.diagnostics, labeled.diagnostics],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::TrackedLabels;
    use crate::memory::InMemoryTracker;
    use crate::query::ScopeSelector;

    fn settings() -> SyncSettings {
        let mut settings = SyncSettings::new(
            ScopeSelector::FilterId("7".into()),
            TrackedLabels::new("Canon", ["Alias"]).unwrap(),
        );
        settings.core_issue_types = vec!["Epic".into()];
        settings.ignored_statuses = vec!["Canceled".into()];
        settings.page_size = 2;
        settings
    }

    #[test]
    fn test_core_scope_filters_type_and_status() {
        let settings = settings();
        let tracker = InMemoryTracker::new();
        tracker.insert(Issue::new("CORE-1").with_type("Epic").with_status("Open"));
        tracker.insert(Issue::new("CORE-2").with_type("Bug").with_status("Open"));
        tracker.insert(Issue::new("CORE-3").with_type("epic").with_status("canceled"));
        tracker.insert(Issue::new("CORE-4").with_type("Epic").with_status("Done"));
        tracker.register_query("filter = 7", |issue| issue.key.starts_with("CORE-"));

        let outcome = ScopeResolver::new(&tracker, &settings).load_core_scope().unwrap();
        let keys: Vec<&str> = outcome.issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["CORE-1", "CORE-4"]);
        assert_eq!(outcome.diagnostics.issues_fetched, 4);
        assert_eq!(outcome.diagnostics.pages_fetched, 2);
    }

    #[test]
    fn test_resolve_collects_both_scopes() {
        let settings = settings();
        let tracker = InMemoryTracker::new();
        tracker.insert(Issue::new("CORE-1").with_type("Epic").with_status("Open"));
        tracker.insert(Issue::new("EXT-1").with_status("Open").with_labels(["alias"]));
        tracker.insert(Issue::new("EXT-2").with_status("Open").with_labels(["other"]));
        tracker.register_query("filter = 7", |issue| issue.key.starts_with("CORE-"));
        let tracked = settings.labels.clone();
        tracker.register_query(&settings.labeled_scope_jql(), move |issue| {
            issue.labels().iter().any(|label| tracked.is_tracked(label))
        });

        let scope = ScopeResolver::new(&tracker, &settings).resolve().unwrap();
        assert!(scope.is_core("CORE-1"));
        assert!(!scope.is_core("EXT-1"));
        assert_eq!(scope.labeled_issues.len(), 1);
        assert_eq!(scope.labeled_issues[0].key, "EXT-1");

        let summary = scope.pagination_summary();
        assert_eq!(summary.queries_executed, 2);
        assert_eq!(summary.issues_fetched, 2);
        assert_eq!(summary.reported_total_mismatches, 0);
    }
}
