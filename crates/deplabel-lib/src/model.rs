//! Core data types for deplabel-lib.
//!
//! Field names follow the tracker's REST representation so search and issue
//! responses deserialize straight into these types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Direction of a link as stored on the issue that holds it.
///
/// A link whose far end is reported under `outwardIssue` reads with the
/// outward phrase ("blocks"); one under `inwardIssue` reads with the inward
/// phrase ("is blocked by").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    Inward,
    Outward,
}

impl LinkDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inward => "inward",
            Self::Outward => "outward",
        }
    }

    /// The same link seen from the other endpoint.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Inward => Self::Outward,
            Self::Outward => Self::Inward,
        }
    }
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkDirection {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inward" => Ok(Self::Inward),
            "outward" => Ok(Self::Outward),
            other => Err(SyncError::validation(
                "link_directions",
                format!("'{other}' is not one of: inward, outward"),
            )),
        }
    }
}

/// A `{ "id": ..., "name": ... }` reference such as a status or issue type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl NamedRef {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Link type metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkType {
    /// Stable identifier; survives renames and localisation.
    #[serde(default)]
    pub id: String,
    /// Display name (e.g. "Blocks", "Cloners").
    #[serde(default)]
    pub name: String,
    /// Inward phrase (e.g. "is blocked by").
    #[serde(default)]
    pub inward: String,
    /// Outward phrase (e.g. "blocks").
    #[serde(default)]
    pub outward: String,
}

/// The far end of a link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueRef {
    pub key: String,
}

/// One link record as stored on an issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,

    #[serde(
        rename = "inwardIssue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inward_issue: Option<IssueRef>,

    #[serde(
        rename = "outwardIssue",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub outward_issue: Option<IssueRef>,
}

impl IssueLink {
    /// Build a link held by one issue pointing outward at `key`.
    #[must_use]
    pub fn outward(link_type: LinkType, key: impl Into<String>) -> Self {
        Self {
            id: None,
            link_type,
            inward_issue: None,
            outward_issue: Some(IssueRef { key: key.into() }),
        }
    }

    /// Build a link held by one issue pointing inward at `key`.
    #[must_use]
    pub fn inward(link_type: LinkType, key: impl Into<String>) -> Self {
        Self {
            id: None,
            link_type,
            inward_issue: Some(IssueRef { key: key.into() }),
            outward_issue: None,
        }
    }

    /// Direction of this link from the holder's point of view.
    #[must_use]
    pub const fn direction(&self) -> Option<LinkDirection> {
        if self.outward_issue.is_some() {
            Some(LinkDirection::Outward)
        } else if self.inward_issue.is_some() {
            Some(LinkDirection::Inward)
        } else {
            None
        }
    }

    /// Key of the opposite endpoint, if the record names one.
    #[must_use]
    pub fn linked_key(&self) -> Option<&str> {
        self.outward_issue
            .as_ref()
            .or(self.inward_issue.as_ref())
            .map(|r| r.key.as_str())
            .filter(|key| !key.is_empty())
    }
}

/// The subset of issue fields the engine reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueFields {
    #[serde(rename = "issuetype", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<NamedRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NamedRef>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,

    #[serde(rename = "issuelinks", default, deserialize_with = "null_as_default")]
    pub links: Vec<IssueLink>,
}

/// An issue as returned by search or lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Unique key (e.g., "PROJ-123"). Compared case-sensitively.
    pub key: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: IssueFields,
}

impl Issue {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: IssueFields::default(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, issue_type: impl Into<String>) -> Self {
        self.fields.issue_type = Some(NamedRef::named(issue_type));
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.fields.status = Some(NamedRef::named(status));
        self
    }

    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: IssueLink) -> Self {
        self.fields.links.push(link);
        self
    }

    /// Status name, or `""` when the field was not returned.
    #[must_use]
    pub fn status_name(&self) -> &str {
        self.fields
            .status
            .as_ref()
            .map_or("", |status| status.name.as_str())
    }

    /// Issue type name, or `""` when the field was not returned.
    #[must_use]
    pub fn issue_type_name(&self) -> &str {
        self.fields
            .issue_type
            .as_ref()
            .map_or("", |issue_type| issue_type.name.as_str())
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.fields.labels
    }

    #[must_use]
    pub fn links(&self) -> &[IssueLink] {
        &self.fields.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_ISSUE: &str = r#"{
        "id": "10001",
        "key": "EXT-1",
        "fields": {
            "issuetype": {"id": "3", "name": "Story"},
            "status": {"name": "Open"},
            "labels": ["DFS_CORE_Dependecies", "frontend"],
            "issuelinks": [
                {
                    "id": "500",
                    "type": {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                    "inwardIssue": {"key": "CORE-1", "fields": {"summary": "ignored"}}
                }
            ]
        }
    }"#;

    #[test]
    fn test_deserialize_search_issue() {
        let issue: Issue = serde_json::from_str(SEARCH_ISSUE).unwrap();
        assert_eq!(issue.key, "EXT-1");
        assert_eq!(issue.issue_type_name(), "Story");
        assert_eq!(issue.status_name(), "Open");
        assert_eq!(issue.labels(), ["DFS_CORE_Dependecies", "frontend"]);
        assert_eq!(issue.links().len(), 1);

        let link = &issue.links()[0];
        assert_eq!(link.link_type.id, "10000");
        assert_eq!(link.direction(), Some(LinkDirection::Inward));
        assert_eq!(link.linked_key(), Some("CORE-1"));
    }

    #[test]
    fn test_null_collections_become_empty() {
        let issue: Issue =
            serde_json::from_str(r#"{"key": "EXT-2", "fields": {"labels": null, "issuelinks": null}}"#)
                .unwrap();
        assert!(issue.labels().is_empty());
        assert!(issue.links().is_empty());
        assert_eq!(issue.status_name(), "");
    }

    #[test]
    fn test_missing_fields_object() {
        let issue: Issue = serde_json::from_str(r#"{"key": "EXT-3"}"#).unwrap();
        assert_eq!(issue.key, "EXT-3");
        assert_eq!(issue.issue_type_name(), "");
    }

    #[test]
    fn test_link_without_endpoint() {
        let link = IssueLink::default();
        assert_eq!(link.direction(), None);
        assert_eq!(link.linked_key(), None);
    }

    #[test]
    fn test_direction_parse_and_reverse() {
        assert_eq!(" Outward ".parse::<LinkDirection>().unwrap(), LinkDirection::Outward);
        assert!("sideways".parse::<LinkDirection>().is_err());
        assert_eq!(LinkDirection::Inward.reversed(), LinkDirection::Outward);
    }
}
