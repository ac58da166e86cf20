//! The issue tracker capability consumed by the engine.
//!
//! Implementations block until each call completes. Retries for transient
//! failures belong inside the implementation and are invisible here.

use serde::Serialize;

use crate::error::Result;
use crate::model::Issue;
use crate::paginate::PaginationStyle;
use crate::plan::PlannedChange;

/// Position of the next page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Zero-based index of the first issue of the page.
    Offset(u64),
    /// Continuation token from the previous page, `None` for the first page.
    Token(Option<String>),
}

/// One page request.
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub jql: &'a str,
    pub fields: &'a [&'a str],
    pub max_results: u32,
    pub cursor: PageCursor,
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub issues: Vec<Issue>,
    /// Total match count, when the backend reports one.
    pub total: Option<u64>,
    /// Continuation token for the next page (token style only).
    pub next_page_token: Option<String>,
}

/// Fetch a single page of issues matching a query.
pub trait SearchBackend {
    /// Fetch the page described by `request`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the request fails.
    fn search_page(&self, request: &PageRequest<'_>) -> Result<SearchPage>;
}

/// Labels to add and remove in one update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelUpdate {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl LabelUpdate {
    /// Sorted add and remove lists for one planned change. Removals name
    /// every staged spelling.
    #[must_use]
    pub fn from_change(change: &PlannedChange) -> Self {
        Self {
            add: change
                .labels_to_add
                .iter()
                .map(|label| label.as_str().to_string())
                .collect(),
            remove: change.spellings_to_remove.iter().cloned().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Everything the engine needs from an issue tracker.
pub trait IssueTracker: SearchBackend {
    /// Pagination protocol spoken by this tracker. Fixed for the process.
    fn pagination_style(&self) -> PaginationStyle;

    /// Read one issue with the given fields.
    ///
    /// # Errors
    ///
    /// Returns `Transport` or `IssueNotFound` if the lookup fails.
    fn get_issue(&self, key: &str, fields: &[&str]) -> Result<Issue>;

    /// Apply one combined add/remove label update to an issue.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the update is rejected.
    fn update_labels(&self, key: &str, update: &LabelUpdate) -> Result<()>;
}
