//! The reconciler: scope, plan, apply.

use crate::apply::{ApplyMode, ApplyReport, apply_plan};
use crate::error::Result;
use crate::paginate::{PaginationDiagnostics, PaginationSummary};
use crate::plan::{Plan, Planner};
use crate::scope::{ResolvedScope, ScopeResolver};
use crate::settings::SyncSettings;
use crate::tracker::IssueTracker;

/// One reconciliation run against a tracker.
///
/// Pagination diagnostics of every query issued through this reconciler are
/// kept so a run-wide summary can be reported at the end.
pub struct Reconciler<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    settings: &'a SyncSettings,
    diagnostics: Vec<PaginationDiagnostics>,
}

impl<'a, T: IssueTracker + ?Sized> Reconciler<'a, T> {
    #[must_use]
    pub const fn new(tracker: &'a T, settings: &'a SyncSettings) -> Self {
        Self {
            tracker,
            settings,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        self.settings
    }

    /// Load the core and labeled scopes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for out-of-range settings (before any request) or
    /// `Transport` if a search fails.
    pub fn resolve_scope(&mut self) -> Result<ResolvedScope> {
        self.settings.validate()?;
        let scope = ScopeResolver::new(self.tracker, self.settings).resolve()?;
        self.diagnostics.extend(scope.diagnostics.iter().cloned());
        Ok(scope)
    }

    /// Plan against an already resolved scope.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if a linked issue lookup fails.
    pub fn plan_scope(&self, scope: &ResolvedScope) -> Result<Plan> {
        Planner::new(self.tracker, self.settings).build_plan(scope)
    }

    /// Resolve the scope and plan against it.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_scope`] and [`Self::plan_scope`].
    pub fn build_plan(&mut self) -> Result<Plan> {
        let scope = self.resolve_scope()?;
        self.plan_scope(&scope)
    }

    /// Preview or execute a plan. Per-issue failures land in the report.
    #[must_use]
    pub fn apply_plan(&self, plan: &Plan, mode: ApplyMode) -> ApplyReport {
        apply_plan(self.tracker, &plan.changes, mode, plan.stats)
    }

    /// Diagnostics of every query issued so far, in order.
    #[must_use]
    pub fn diagnostics(&self) -> &[PaginationDiagnostics] {
        &self.diagnostics
    }

    #[must_use]
    pub fn pagination_summary(&self) -> PaginationSummary {
        self.diagnostics.iter().collect()
    }
}
