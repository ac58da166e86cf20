//! In-memory issue tracker.
//!
//! Implements [`IssueTracker`] without any network dependency. Queries are
//! registered up front as `(jql, predicate)` pairs and evaluated against the
//! current issue state on every page request, so label updates made during a
//! run are visible to the next run.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SyncError};
use crate::model::Issue;
use crate::paginate::PaginationStyle;
use crate::tracker::{IssueTracker, LabelUpdate, PageCursor, PageRequest, SearchBackend, SearchPage};

type Predicate = Box<dyn Fn(&Issue) -> bool>;

/// In-memory tracker for tests and offline dry runs.
pub struct InMemoryTracker {
    issues: RefCell<BTreeMap<String, Issue>>,
    queries: RefCell<Vec<(String, Predicate)>>,
    style: PaginationStyle,
    report_totals: bool,
    total_overrides: RefCell<BTreeMap<String, u64>>,
    failing_updates: RefCell<BTreeSet<String>>,
    lookups: RefCell<Vec<String>>,
    searches: Cell<usize>,
    updates: RefCell<Vec<(String, LabelUpdate)>>,
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTracker")
            .field("issues", &self.issues.borrow().len())
            .field("queries", &self.queries.borrow().len())
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl InMemoryTracker {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Empty tracker speaking offset pagination and reporting totals.
    #[must_use]
    pub fn new() -> Self {
        Self {
            issues: RefCell::new(BTreeMap::new()),
            queries: RefCell::new(Vec::new()),
            style: PaginationStyle::Offset,
            report_totals: true,
            total_overrides: RefCell::new(BTreeMap::new()),
            failing_updates: RefCell::new(BTreeSet::new()),
            lookups: RefCell::new(Vec::new()),
            searches: Cell::new(0),
            updates: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: PaginationStyle) -> Self {
        self.style = style;
        self
    }

    /// Stop reporting a total match count on search pages.
    #[must_use]
    pub fn without_totals(mut self) -> Self {
        self.report_totals = false;
        self
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Insert or replace an issue.
    pub fn insert(&self, issue: Issue) {
        self.issues.borrow_mut().insert(issue.key.clone(), issue);
    }

    /// Register the predicate that answers `jql`. Re-registering replaces it.
    pub fn register_query<F>(&self, jql: &str, predicate: F)
    where
        F: Fn(&Issue) -> bool + 'static,
    {
        let jql = jql.trim().to_string();
        let mut queries = self.queries.borrow_mut();
        queries.retain(|(existing, _)| *existing != jql);
        queries.push((jql, Box::new(predicate)));
    }

    /// Report `total` for `jql` regardless of how many issues match.
    pub fn override_total(&self, jql: &str, total: u64) {
        self.total_overrides
            .borrow_mut()
            .insert(jql.trim().to_string(), total);
    }

    /// Make every label update for `key` fail.
    pub fn fail_updates_for(&self, key: &str) {
        self.failing_updates.borrow_mut().insert(key.to_string());
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn issue(&self, key: &str) -> Option<Issue> {
        self.issues.borrow().get(key).cloned()
    }

    /// Current labels of `key`, empty if the issue does not exist.
    #[must_use]
    pub fn labels_of(&self, key: &str) -> Vec<String> {
        self.issues
            .borrow()
            .get(key)
            .map(|issue| issue.labels().to_vec())
            .unwrap_or_default()
    }

    /// Keys passed to `get_issue`, in call order.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    /// Number of page requests served.
    #[must_use]
    pub fn search_count(&self) -> usize {
        self.searches.get()
    }

    /// Updates that were applied, in call order.
    #[must_use]
    pub fn updates(&self) -> Vec<(String, LabelUpdate)> {
        self.updates.borrow().clone()
    }

    fn matching(&self, jql: &str) -> Result<Vec<Issue>> {
        let queries = self.queries.borrow();
        let Some((_, predicate)) = queries.iter().find(|(registered, _)| registered == jql) else {
            return Err(SyncError::transport(
                "search",
                Some(400),
                format!("no query registered for `{jql}`"),
            ));
        };
        Ok(self
            .issues
            .borrow()
            .values()
            .filter(|issue| predicate(issue))
            .cloned()
            .collect())
    }
}

impl SearchBackend for InMemoryTracker {
    fn search_page(&self, request: &PageRequest<'_>) -> Result<SearchPage> {
        self.searches.set(self.searches.get() + 1);
        let jql = request.jql.trim();
        let matches = self.matching(jql)?;

        let start = match &request.cursor {
            PageCursor::Offset(offset) => usize::try_from(*offset).unwrap_or(usize::MAX),
            PageCursor::Token(None) => 0,
            PageCursor::Token(Some(token)) => token.parse().map_err(|_| {
                SyncError::transport("search", Some(400), format!("invalid page token `{token}`"))
            })?,
        };
        let start = start.min(matches.len());
        let end = start
            .saturating_add(request.max_results as usize)
            .min(matches.len());

        let total = if self.report_totals {
            let overridden = self.total_overrides.borrow().get(jql).copied();
            Some(overridden.unwrap_or(matches.len() as u64))
        } else {
            None
        };
        let next_page_token = match self.style {
            PaginationStyle::Token if end < matches.len() => Some(end.to_string()),
            _ => None,
        };

        Ok(SearchPage {
            issues: matches[start..end].to_vec(),
            total,
            next_page_token,
        })
    }
}

impl IssueTracker for InMemoryTracker {
    fn pagination_style(&self) -> PaginationStyle {
        self.style
    }

    fn get_issue(&self, key: &str, _fields: &[&str]) -> Result<Issue> {
        self.lookups.borrow_mut().push(key.to_string());
        self.issue(key).ok_or_else(|| SyncError::IssueNotFound {
            key: key.to_string(),
        })
    }

    fn update_labels(&self, key: &str, update: &LabelUpdate) -> Result<()> {
        if self.failing_updates.borrow().contains(key) {
            return Err(SyncError::transport(
                format!("update labels on {key}"),
                Some(400),
                "update rejected",
            ));
        }

        let mut issues = self.issues.borrow_mut();
        let issue = issues.get_mut(key).ok_or_else(|| SyncError::IssueNotFound {
            key: key.to_string(),
        })?;

        let labels = &mut issue.fields.labels;
        labels.retain(|label| !update.remove.contains(label));
        for label in &update.add {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }

        self.updates
            .borrow_mut()
            .push((key.to_string(), update.clone()));
        Ok(())
    }
}
