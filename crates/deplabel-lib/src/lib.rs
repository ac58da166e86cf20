//! `deplabel-lib` - reconciliation engine for a canonical dependency label.
//!
//! Computes the desired label state for issues that carry an authoritative
//! dependency link to a "core" issue set, diffs it against the labels the
//! tracker reports, and emits the minimal add/remove operations.
//!
//! The engine never talks to the network itself. Everything it needs from the
//! tracker goes through the [`IssueTracker`] trait; [`InMemoryTracker`] is a
//! complete in-process implementation.
//!
//! # Quick Start
//!
//! ```no_run
//! use deplabel_lib::{ApplyMode, InMemoryTracker, Reconciler, SyncSettings};
//!
//! # fn settings() -> SyncSettings { unimplemented!() }
//! let tracker = InMemoryTracker::new();
//! let settings = settings();
//!
//! let mut reconciler = Reconciler::new(&tracker, &settings);
//! let plan = reconciler.build_plan().unwrap();
//! let report = reconciler.apply_plan(&plan, ApplyMode::Preview);
//! println!("{} label(s) to add", report.stats.labels_added);
//! ```

pub mod apply;
pub mod audit;
pub mod engine;
pub mod error;
pub mod labels;
pub mod links;
pub mod memory;
pub mod model;
pub mod paginate;
pub mod plan;
pub mod query;
pub mod scope;
pub mod settings;
pub mod tracker;

pub use apply::{AppliedChange, ApplyFailure, ApplyMode, ApplyReport, apply_plan};
pub use audit::{AuditContext, AuditRecord};
pub use engine::Reconciler;
pub use error::{Result, SyncError};
pub use labels::{Label, LabelPresence, TrackedLabels};
pub use links::{LinkMatchMode, LinkPolicy, Viewpoint};
pub use memory::InMemoryTracker;
pub use model::{Issue, IssueLink, LinkDirection};
pub use paginate::{
    EndedBy, PaginationDiagnostics, PaginationStyle, PaginationSummary, Paginator, SearchOutcome,
};
pub use plan::{ChangeSet, Plan, PlannedChange, Planner, RunStats};
pub use query::ScopeSelector;
pub use scope::{ResolvedScope, ScopeResolver};
pub use settings::{IgnoredStatusPolicy, SyncSettings};
pub use tracker::{IssueTracker, LabelUpdate, PageCursor, PageRequest, SearchBackend, SearchPage};
