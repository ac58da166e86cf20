//! Complete result sets from paginated searches.
//!
//! Two protocols are normalized into one issue sequence plus diagnostics:
//!
//! - Offset style advances `startAt` by the number of issues returned and
//!   stops on an empty page or once the offset reaches the reported total.
//! - Token style forwards the continuation token of the previous page and
//!   stops on an empty page or when no token comes back.
//!
//! A reported total that disagrees with what was fetched is a diagnostic, not
//! an error: it means the scope definition and the live index are skewed.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::Result;
use crate::model::Issue;
use crate::tracker::{PageCursor, PageRequest, SearchBackend};

/// Default page size requested from the backend.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default upper bound on pages fetched for one query.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Pagination protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// Numeric `startAt` offsets (Server / Data Center).
    Offset,
    /// Opaque continuation tokens (Cloud).
    Token,
}

impl PaginationStyle {
    /// Select the protocol for a tracker host.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        if host.to_lowercase().ends_with(".atlassian.net") {
            Self::Token
        } else {
            Self::Offset
        }
    }
}

impl fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offset => "offset",
            Self::Token => "token",
        })
    }
}

/// Why a paginated fetch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndedBy {
    EmptyPage,
    ReportedTotalReached,
    TokenExhausted,
    /// The page guard tripped before the backend signalled the end.
    Unknown,
}

impl fmt::Display for EndedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyPage => "empty_page",
            Self::ReportedTotalReached => "reported_total_reached",
            Self::TokenExhausted => "token_exhausted",
            Self::Unknown => "unknown",
        })
    }
}

/// Diagnostics for one completed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationDiagnostics {
    pub jql: String,
    pub style: PaginationStyle,
    pub pages_fetched: u32,
    /// Unique issues returned to the caller.
    pub issues_fetched: usize,
    /// Issues seen again on a later page and dropped.
    pub duplicates_dropped: usize,
    pub reported_total: Option<u64>,
    pub ended_by: EndedBy,
}

impl PaginationDiagnostics {
    /// True when the backend reported a total that differs from what was fetched.
    #[must_use]
    pub fn has_mismatch(&self) -> bool {
        self.reported_total
            .is_some_and(|total| total != self.issues_fetched as u64)
    }
}

/// Issues plus diagnostics for one query.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub issues: Vec<Issue>,
    pub diagnostics: PaginationDiagnostics,
}

/// Run-wide pagination totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationSummary {
    pub queries_executed: usize,
    pub pages_fetched: usize,
    pub issues_fetched: usize,
    pub duplicates_dropped: usize,
    pub reported_total_mismatches: usize,
}

impl PaginationSummary {
    pub fn record(&mut self, diagnostics: &PaginationDiagnostics) {
        self.queries_executed += 1;
        self.pages_fetched += diagnostics.pages_fetched as usize;
        self.issues_fetched += diagnostics.issues_fetched;
        self.duplicates_dropped += diagnostics.duplicates_dropped;
        if diagnostics.has_mismatch() {
            self.reported_total_mismatches += 1;
        }
    }
}

impl<'a> FromIterator<&'a PaginationDiagnostics> for PaginationSummary {
    fn from_iter<I: IntoIterator<Item = &'a PaginationDiagnostics>>(iter: I) -> Self {
        let mut summary = Self::default();
        for diagnostics in iter {
            summary.record(diagnostics);
        }
        summary
    }
}

/// Accumulates pages and drops issues already seen.
struct Collector {
    issues: Vec<Issue>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl Collector {
    fn new() -> Self {
        Self {
            issues: Vec::new(),
            seen: HashSet::new(),
            duplicates: 0,
        }
    }

    fn absorb(&mut self, page: Vec<Issue>) {
        for issue in page {
            if self.seen.insert(issue.key.clone()) {
                self.issues.push(issue);
            } else {
                self.duplicates += 1;
            }
        }
    }
}

/// Drives a [`SearchBackend`] until a query is exhausted.
pub struct Paginator<'a, B: SearchBackend + ?Sized> {
    backend: &'a B,
    style: PaginationStyle,
    page_size: u32,
    max_pages: u32,
}

impl<'a, B: SearchBackend + ?Sized> Paginator<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B, style: PaginationStyle) -> Self {
        Self {
            backend,
            style,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch every issue matching `jql`.
    ///
    /// # Errors
    ///
    /// Returns the first error the backend reports; pages fetched before it
    /// are discarded.
    pub fn fetch_all(&self, jql: &str, fields: &[&str]) -> Result<SearchOutcome> {
        let (collector, pages, reported_total, ended_by) = match self.style {
            PaginationStyle::Offset => self.fetch_offset(jql, fields)?,
            PaginationStyle::Token => self.fetch_token(jql, fields)?,
        };

        let diagnostics = PaginationDiagnostics {
            jql: jql.to_string(),
            style: self.style,
            pages_fetched: pages,
            issues_fetched: collector.issues.len(),
            duplicates_dropped: collector.duplicates,
            reported_total,
            ended_by,
        };

        if diagnostics.has_mismatch() {
            tracing::warn!(
                jql,
                reported_total = ?diagnostics.reported_total,
                fetched = diagnostics.issues_fetched,
                "Pagination mismatch: reported total differs from issues fetched"
            );
        }
        if diagnostics.duplicates_dropped > 0 {
            tracing::warn!(
                jql,
                duplicates = diagnostics.duplicates_dropped,
                "Dropped issues returned on more than one page"
            );
        }
        tracing::debug!(
            jql,
            pages = diagnostics.pages_fetched,
            issues = diagnostics.issues_fetched,
            ended_by = %diagnostics.ended_by,
            "Search complete"
        );

        Ok(SearchOutcome {
            issues: collector.issues,
            diagnostics,
        })
    }

    fn page_guard_tripped(&self, pages: u32, jql: &str) -> bool {
        if pages < self.max_pages {
            return false;
        }
        tracing::warn!(jql, pages, "Stopped paginating after reaching the page limit");
        true
    }

    fn fetch_offset(
        &self,
        jql: &str,
        fields: &[&str],
    ) -> Result<(Collector, u32, Option<u64>, EndedBy)> {
        let mut collector = Collector::new();
        let mut pages = 0u32;
        let mut reported_total = None;
        let mut start_at = 0u64;

        let ended_by = loop {
            if self.page_guard_tripped(pages, jql) {
                break EndedBy::Unknown;
            }

            let request = PageRequest {
                jql,
                fields,
                max_results: self.page_size,
                cursor: PageCursor::Offset(start_at),
            };
            let page = self.backend.search_page(&request)?;
            pages += 1;
            if page.total.is_some() {
                reported_total = page.total;
            }
            tracing::debug!(jql, start_at, returned = page.issues.len(), "Fetched page");

            if page.issues.is_empty() {
                break EndedBy::EmptyPage;
            }

            start_at += page.issues.len() as u64;
            collector.absorb(page.issues);

            if reported_total.is_some_and(|total| start_at >= total) {
                break EndedBy::ReportedTotalReached;
            }
        };

        Ok((collector, pages, reported_total, ended_by))
    }

    fn fetch_token(
        &self,
        jql: &str,
        fields: &[&str],
    ) -> Result<(Collector, u32, Option<u64>, EndedBy)> {
        let mut collector = Collector::new();
        let mut pages = 0u32;
        let mut reported_total = None;
        let mut token: Option<String> = None;

        let ended_by = loop {
            if self.page_guard_tripped(pages, jql) {
                break EndedBy::Unknown;
            }

            let request = PageRequest {
                jql,
                fields,
                max_results: self.page_size,
                cursor: PageCursor::Token(token.take()),
            };
            let page = self.backend.search_page(&request)?;
            pages += 1;
            if page.total.is_some() {
                reported_total = page.total;
            }
            tracing::debug!(jql, page = pages, returned = page.issues.len(), "Fetched page");

            if page.issues.is_empty() {
                break EndedBy::EmptyPage;
            }
            collector.absorb(page.issues);

            match page.next_page_token.filter(|next| !next.is_empty()) {
                Some(next) => token = Some(next),
                None => break EndedBy::TokenExhausted,
            }
        };

        Ok((collector, pages, reported_total, ended_by))
    }
}
