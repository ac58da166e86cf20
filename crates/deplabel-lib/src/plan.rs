//! Change planning: the reconciliation core.
//!
//! Two passes write into one [`ChangeSet`]:
//!
//! - Discovery walks the authoritative links stored on core issues, looks up
//!   each external issue once and stages the canonical label (plus alias
//!   removal) where it is missing.
//! - Cleanup walks every issue that currently carries a tracked label and
//!   either migrates its aliases (still depends on core) or strips every
//!   tracked label (no surviving dependency).
//!
//! Both passes share [`LabelDelta::reconcile`], so an issue ends up with the
//! same labels however it is discovered first. [`ChangeSet::finalize`] drops
//! any label staged for both add and remove from the add side.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SyncError};
use crate::labels::{Label, LabelPresence, TrackedLabels};
use crate::links::{LinkPolicy, Viewpoint};
use crate::query::LOOKUP_FIELDS;
use crate::scope::ResolvedScope;
use crate::settings::{IgnoredStatusPolicy, SyncSettings};
use crate::tracker::IssueTracker;

/// Run counters. Monotonic within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Core issues examined by discovery.
    pub issues_scanned: usize,
    /// Authoritative link occurrences from core to non-core issues.
    pub dependencies_found: usize,
    pub labels_added: usize,
    pub labels_removed: usize,
}

/// Labels to add and remove on one issue, with the reasons why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub issue_key: String,
    pub labels_to_add: BTreeSet<Label>,
    pub labels_to_remove: BTreeSet<Label>,
    /// Every exact spelling staged for removal. Several spellings can share
    /// one entry in `labels_to_remove`.
    pub spellings_to_remove: BTreeSet<String>,
    pub reasons: Vec<String>,
}

impl PlannedChange {
    #[must_use]
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels_to_add.is_empty() && self.labels_to_remove.is_empty()
    }

    /// Stage `label` for removal under its own spelling.
    pub fn stage_removal(&mut self, label: Label) {
        self.spellings_to_remove.insert(label.as_str().to_string());
        self.labels_to_remove.insert(label);
    }

    fn push_reason(&mut self, reason: String) {
        if !reason.is_empty() && !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    /// Removal wins over addition.
    fn resolve_conflicts(&mut self) {
        let remove = &self.labels_to_remove;
        self.labels_to_add.retain(|label| !remove.contains(label));
    }
}

/// Per-issue planned changes, keyed by issue key.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: BTreeMap<String, PlannedChange>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge labels and a reason into the change for `key`, creating it if
    /// needed. Label sets are unioned; the reason is appended unless already
    /// recorded.
    pub fn upsert<A, R>(&mut self, key: &str, to_add: A, to_remove: R, reason: impl Into<String>)
    where
        A: IntoIterator<Item = Label>,
        R: IntoIterator<Item = Label>,
    {
        let change = self
            .changes
            .entry(key.to_string())
            .or_insert_with(|| PlannedChange::new(key));
        change.labels_to_add.extend(to_add);
        for label in to_remove {
            change.stage_removal(label);
        }
        change.push_reason(reason.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PlannedChange> {
        self.changes.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Resolve add/remove conflicts and drop empty changes. Output is sorted
    /// by issue key.
    #[must_use]
    pub fn finalize(self) -> Vec<PlannedChange> {
        self.changes
            .into_values()
            .filter_map(|mut change| {
                change.resolve_conflicts();
                (!change.is_empty()).then_some(change)
            })
            .collect()
    }
}

/// The labels one issue needs added and removed to match its dependency state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDelta {
    pub add: Vec<Label>,
    pub remove: Vec<Label>,
}

impl LabelDelta {
    /// An issue that depends on core carries exactly the canonical label; one
    /// that does not carries no tracked label at all.
    #[must_use]
    pub fn reconcile(tracked: &TrackedLabels, presence: &LabelPresence, depends_on_core: bool) -> Self {
        if depends_on_core {
            Self {
                add: if presence.has_canonical() {
                    Vec::new()
                } else {
                    vec![tracked.canonical().clone()]
                },
                remove: presence.aliases.clone(),
            }
        } else {
            Self {
                add: Vec::new(),
                remove: presence.all(),
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// A finalized plan and the counters gathered while building it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
    pub stats: RunStats,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn dependency_reason(core_keys: &BTreeSet<&str>, delta: &LabelDelta) -> String {
    let mut parts = Vec::new();
    if !delta.add.is_empty() {
        parts.push("canonical label missing".to_string());
    }
    if !delta.remove.is_empty() {
        parts.push(format!(
            "alias label(s) present: {}",
            join(delta.remove.iter().map(Label::as_str))
        ));
    }
    format!(
        "Authoritative dependency of core {}: {}",
        join(core_keys),
        parts.join("; ")
    )
}

fn orphan_reason(delta: &LabelDelta) -> String {
    format!(
        "No authoritative link to a core issue remains; removing {}",
        join(delta.remove.iter().map(Label::as_str))
    )
}

/// External keys authoritatively linked from core issues, each mapped to the
/// core keys that link it. Counts every link occurrence into
/// `dependencies_found`.
#[must_use]
pub fn collect_dependents<'a>(
    policy: &LinkPolicy,
    scope: &'a ResolvedScope,
    stats: &mut RunStats,
) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for core in &scope.core_issues {
        for link in core.links() {
            let Some(key) = policy.authoritative_key(link, Viewpoint::Holder) else {
                continue;
            };
            if scope.is_core(key) {
                continue;
            }
            stats.dependencies_found += 1;
            dependents.entry(key).or_default().insert(core.key.as_str());
        }
    }
    dependents
}

/// The cleanup pass. Reads only the labeled scope; never calls the tracker.
pub fn plan_cleanup(settings: &SyncSettings, scope: &ResolvedScope, changes: &mut ChangeSet) {
    let tracked = &settings.labels;

    for issue in &scope.labeled_issues {
        if scope.is_core(&issue.key) {
            continue;
        }

        let presence = tracked.presence(issue.labels());
        if presence.is_empty() {
            continue;
        }

        if settings.is_ignored_status(issue.status_name()) {
            if settings.ignored_status_policy == IgnoredStatusPolicy::Cleanup {
                let delta = LabelDelta::reconcile(tracked, &presence, false);
                let reason = format!(
                    "Status '{}' is ignored; removing {}",
                    issue.status_name(),
                    join(delta.remove.iter().map(Label::as_str))
                );
                changes.upsert(&issue.key, delta.add, delta.remove, reason);
            }
            continue;
        }

        let core_links: BTreeSet<&str> = settings
            .links
            .linked_keys(issue, Viewpoint::Peer)
            .into_iter()
            .filter(|key| scope.is_core(key))
            .collect();
        let depends_on_core = !core_links.is_empty();

        let delta = LabelDelta::reconcile(tracked, &presence, depends_on_core);
        if delta.is_empty() {
            continue;
        }

        let reason = if depends_on_core {
            dependency_reason(&core_links, &delta)
        } else {
            orphan_reason(&delta)
        };
        tracing::debug!(issue = %issue.key, depends_on_core, "Cleanup staged change");
        changes.upsert(&issue.key, delta.add, delta.remove, reason);
    }
}

/// Builds a [`Plan`] from a resolved scope.
pub struct Planner<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    settings: &'a SyncSettings,
}

impl<'a, T: IssueTracker + ?Sized> Planner<'a, T> {
    #[must_use]
    pub const fn new(tracker: &'a T, settings: &'a SyncSettings) -> Self {
        Self { tracker, settings }
    }

    /// Run discovery and cleanup, then finalize.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if a linked issue lookup fails.
    pub fn build_plan(&self, scope: &ResolvedScope) -> Result<Plan> {
        let mut stats = RunStats {
            issues_scanned: scope.core_issues.len(),
            ..RunStats::default()
        };
        let mut changes = ChangeSet::new();

        self.plan_discovery(scope, &mut changes, &mut stats)?;
        plan_cleanup(self.settings, scope, &mut changes);

        let changes = changes.finalize();
        tracing::info!(
            changes = changes.len(),
            dependencies = stats.dependencies_found,
            "Plan built"
        );
        Ok(Plan { changes, stats })
    }

    /// The discovery pass. Looks up each external dependent exactly once.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if a lookup fails.
    pub fn plan_discovery(
        &self,
        scope: &ResolvedScope,
        changes: &mut ChangeSet,
        stats: &mut RunStats,
    ) -> Result<()> {
        let tracked = &self.settings.labels;
        let dependents = collect_dependents(&self.settings.links, scope, stats);

        for (key, core_keys) in &dependents {
            let issue = match self.tracker.get_issue(key, LOOKUP_FIELDS) {
                Ok(issue) => issue,
                Err(SyncError::IssueNotFound { .. }) => {
                    tracing::warn!(issue = %key, "Linked issue not visible; skipping");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if self.settings.is_ignored_status(issue.status_name()) {
                tracing::debug!(issue = %key, status = issue.status_name(), "Skipping ignored status");
                continue;
            }

            let presence = tracked.presence(issue.labels());
            let delta = LabelDelta::reconcile(tracked, &presence, true);
            if delta.is_empty() {
                continue;
            }

            let reason = dependency_reason(core_keys, &delta);
            changes.upsert(key, delta.add, delta.remove, reason);
        }

        Ok(())
    }
}
