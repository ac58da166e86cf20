//! Plan application.

use serde::Serialize;
use std::fmt;

use crate::plan::{PlannedChange, RunStats};
use crate::tracker::{IssueTracker, LabelUpdate};

/// Whether updates are only reported or actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplyMode {
    #[serde(rename = "DRY_RUN")]
    Preview,
    #[serde(rename = "APPLY")]
    Execute,
}

impl ApplyMode {
    #[must_use]
    pub const fn from_execute(execute: bool) -> Self {
        if execute { Self::Execute } else { Self::Preview }
    }

    #[must_use]
    pub const fn is_execute(self) -> bool {
        matches!(self, Self::Execute)
    }

    /// Console prefix for per-issue lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Preview => "DRY-RUN",
            Self::Execute => "APPLY",
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One issue's update, previewed or successfully sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub issue_key: String,
    pub labels_added: Vec<String>,
    pub labels_removed: Vec<String>,
    pub reasons: Vec<String>,
}

impl AppliedChange {
    /// `add X, Y; remove Z`
    #[must_use]
    pub fn action_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.labels_added.is_empty() {
            parts.push(format!("add {}", self.labels_added.join(", ")));
        }
        if !self.labels_removed.is_empty() {
            parts.push(format!("remove {}", self.labels_removed.join(", ")));
        }
        parts.join("; ")
    }
}

/// An update the tracker rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    pub issue_key: String,
    pub error: String,
}

/// Result of applying a plan.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub mode: ApplyMode,
    pub stats: RunStats,
    pub applied: Vec<AppliedChange>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Preview or execute `changes` in issue-key order.
///
/// Each issue gets one combined update. In execute mode a rejected update is
/// recorded in `failures` and the remaining issues are still processed; the
/// label counters in `stats` only grow for updates that went through. In
/// preview mode nothing is sent and every change counts.
pub fn apply_plan<T: IssueTracker + ?Sized>(
    tracker: &T,
    changes: &[PlannedChange],
    mode: ApplyMode,
    stats: RunStats,
) -> ApplyReport {
    let mut sorted: Vec<&PlannedChange> = changes.iter().filter(|change| !change.is_empty()).collect();
    sorted.sort_by(|a, b| a.issue_key.cmp(&b.issue_key));

    let mut report = ApplyReport {
        mode,
        stats,
        applied: Vec::with_capacity(sorted.len()),
        failures: Vec::new(),
    };

    for change in sorted {
        let update = LabelUpdate::from_change(change);

        if mode.is_execute() {
            if let Err(err) = tracker.update_labels(&change.issue_key, &update) {
                tracing::error!(issue = %change.issue_key, error = %err, "Label update failed");
                report.failures.push(ApplyFailure {
                    issue_key: change.issue_key.clone(),
                    error: err.to_string(),
                });
                continue;
            }
            tracing::info!(issue = %change.issue_key, add = ?update.add, remove = ?update.remove, "Updated labels");
        }

        report.stats.labels_added += update.add.len();
        report.stats.labels_removed += update.remove.len();
        report.applied.push(AppliedChange {
            issue_key: change.issue_key.clone(),
            labels_added: update.add,
            labels_removed: update.remove,
            reasons: change.reasons.clone(),
        });
    }

    report
}
