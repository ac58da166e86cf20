//! Output formatting for `deplabel`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//! Text goes to stdout line by line; `--json` prints one document per command.
//!
//! # JSON Output Types
//!
//! - [`SyncReport`] - Plan outcome, statistics and pagination (sync)
//! - [`ScopeReport`] - Scope sizes, keys and query diagnostics (scope)
//! - [`ConfigView`] - Resolved configuration without secrets (config)

mod output;
mod text;

pub use output::{ConfigView, ScopeReport, SyncReport};
pub use text::{
    format_change_line, format_config, format_diagnostics_line, format_failure_line,
    format_scope, format_summary,
};
