//! Scope selection and JQL construction.

use serde::Serialize;
use std::fmt;

use crate::error::{Result, SyncError};
use crate::labels::TrackedLabels;

/// Fields requested for the core scope query.
pub const CORE_FIELDS: &[&str] = &["issuetype", "status", "issuelinks", "labels"];

/// Fields requested for the labeled scope query.
pub const LABELED_FIELDS: &[&str] = &["issuelinks", "labels", "status"];

/// Fields requested when looking up a single linked issue.
pub const LOOKUP_FIELDS: &[&str] = &["labels", "status"];

/// How the core scope is selected. Exactly one source is ever configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScopeSelector {
    /// A saved filter id.
    FilterId(String),
    /// A literal JQL query.
    LiteralQuery(String),
}

impl ScopeSelector {
    /// Build the selector from the two optional configuration sources.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `Config` if both or neither source is set.
    pub fn from_parts(filter_id: Option<&str>, jql: Option<&str>) -> Result<Self> {
        let filter_id = filter_id.map(str::trim).filter(|value| !value.is_empty());
        let jql = jql.map(str::trim).filter(|value| !value.is_empty());

        match (filter_id, jql) {
            (Some(_), Some(_)) => Err(SyncError::Config(
                "Set only one of JIRA_CORE_FILTER_ID or JIRA_CORE_JQL, not both.".to_string(),
            )),
            (None, None) => Err(SyncError::Config(
                "Set JIRA_CORE_FILTER_ID or JIRA_CORE_JQL.".to_string(),
            )),
            (Some(id), None) => Ok(Self::FilterId(id.to_string())),
            (None, Some(query)) => Ok(Self::LiteralQuery(query.to_string())),
        }
    }

    /// The JQL that selects the core scope.
    #[must_use]
    pub fn to_jql(&self) -> String {
        match self {
            Self::FilterId(id) => format!("filter = {id}"),
            Self::LiteralQuery(query) => query.clone(),
        }
    }

    #[must_use]
    pub fn filter_id(&self) -> Option<&str> {
        match self {
            Self::FilterId(id) => Some(id),
            Self::LiteralQuery(_) => None,
        }
    }

    #[must_use]
    pub fn literal_query(&self) -> Option<&str> {
        match self {
            Self::FilterId(_) => None,
            Self::LiteralQuery(query) => Some(query),
        }
    }
}

impl fmt::Display for ScopeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilterId(id) => write!(f, "filter {id}"),
            Self::LiteralQuery(query) => write!(f, "jql `{query}`"),
        }
    }
}

/// Quote a value as a JQL string literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn quoted_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values.into_iter().map(quote).collect::<Vec<_>>().join(", ")
}

/// JQL selecting every issue that carries the canonical label or an alias.
///
/// When `excluded_statuses` is non-empty a `status NOT IN (...)` clause is
/// appended.
#[must_use]
pub fn labeled_issues_jql(tracked: &TrackedLabels, excluded_statuses: &[String]) -> String {
    let label_clause = if tracked.aliases().is_empty() {
        format!("labels = {}", quote(tracked.canonical().as_str()))
    } else {
        format!(
            "labels IN ({})",
            quoted_list(tracked.iter().map(|label| label.as_str()))
        )
    };

    let statuses: Vec<&str> = excluded_statuses
        .iter()
        .map(|status| status.trim())
        .filter(|status| !status.is_empty())
        .collect();

    if statuses.is_empty() {
        label_clause
    } else {
        format!("{label_clause} AND status NOT IN ({})", quoted_list(statuses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_requires_exactly_one_source() {
        assert!(matches!(
            ScopeSelector::from_parts(Some("123"), Some("project = X")),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            ScopeSelector::from_parts(None, None),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            ScopeSelector::from_parts(Some("  "), Some("")),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_selector_blank_value_counts_as_unset() {
        let selector = ScopeSelector::from_parts(Some(" "), Some(" project = CORE ")).unwrap();
        assert_eq!(selector, ScopeSelector::LiteralQuery("project = CORE".into()));
        assert_eq!(selector.to_jql(), "project = CORE");
        assert_eq!(selector.filter_id(), None);
    }

    #[test]
    fn test_filter_selector_jql() {
        let selector = ScopeSelector::from_parts(Some("1244128"), None).unwrap();
        assert_eq!(selector.to_jql(), "filter = 1244128");
        assert_eq!(selector.filter_id(), Some("1244128"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }

    #[test]
    fn test_labeled_jql_single_label() {
        let tracked = TrackedLabels::new("DFS_CORE_Dependencies", Vec::<String>::new()).unwrap();
        assert_eq!(
            labeled_issues_jql(&tracked, &[]),
            r#"labels = "DFS_CORE_Dependencies""#
        );
    }

    #[test]
    fn test_labeled_jql_with_aliases_and_statuses() {
        let tracked = TrackedLabels::new("Canon", ["Alias"]).unwrap();
        let statuses = vec!["Canceled".to_string(), " ".to_string(), "Won't Do".to_string()];
        assert_eq!(
            labeled_issues_jql(&tracked, &statuses),
            r#"labels IN ("Canon", "Alias") AND status NOT IN ("Canceled", "Won't Do")"#
        );
    }
}
