//! Scope command implementation.
//!
//! Runs the two scope queries and reports what they returned. Nothing is
//! planned and nothing is written.

use anyhow::Result;

use deplabel_lib::{IssueTracker, Reconciler};

use super::{connect, load_config};
use crate::cli::GlobalOpts;
use crate::config::AppConfig;
use crate::format::{ScopeReport, format_scope};

/// Resolve both scopes against `tracker`.
///
/// # Errors
///
/// Returns an error if settings are invalid or a search fails.
pub fn resolve_scope<T: IssueTracker + ?Sized>(
    tracker: &T,
    config: &AppConfig,
) -> deplabel_lib::Result<ScopeReport> {
    let mut reconciler = Reconciler::new(tracker, &config.sync);
    let scope = reconciler.resolve_scope()?;
    Ok(ScopeReport::from(&scope))
}

/// Execute the scope command.
///
/// # Errors
///
/// Returns an error if configuration or Jira access fails.
pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let (layers, config) = load_config(opts)?;
    let client = connect(&config, &layers)?;
    let report = resolve_scope(&client, &config)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_scope(&report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::test_support;

    #[test]
    fn test_scope_report_lists_both_scopes() {
        let config = test_support::config();
        let tracker = test_support::tracker(&config);

        let report = resolve_scope(&tracker, &config).unwrap();

        assert_eq!(report.core_keys, ["CORE-1"]);
        assert_eq!(report.labeled_keys, ["EXT-1", "EXT-2"]);
        assert_eq!(report.queries.len(), 2);
        assert_eq!(report.pagination.issues_fetched, 3);
        assert!(tracker.updates().is_empty());
        assert!(tracker.lookups().is_empty());
    }
}
