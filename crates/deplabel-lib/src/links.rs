//! Authoritative dependency link classification.
//!
//! Policy, in order:
//! 1. Ignored type ids and ignored names (clone relationships by default)
//!    never count.
//! 2. With a non-empty type-id allow-list, a link counts only if its type id
//!    is listed and its direction is allowed. Names are not consulted.
//! 3. Otherwise the type name, inward phrase or outward phrase must match a
//!    configured link name (case-insensitive) and the direction must be allowed.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{Result, SyncError};
use crate::model::{Issue, IssueLink, LinkDirection};

/// Link names that count as dependencies when no id allow-list is set.
pub const DEFAULT_LINK_NAMES: &[&str] = &[
    "blocks",
    "is blocked by",
    "depends on",
    "is dependent on",
    "is a dependency of",
];

/// Names that never count (clone relationships).
pub const DEFAULT_IGNORED_LINK_NAMES: &[&str] = &["clones", "is cloned by"];

/// How allowed links are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMatchMode {
    /// Strict allow-list of link type ids.
    ById,
    /// Case-insensitive match on type name or either phrase.
    ByName,
}

/// Which endpoint's copy of a link is being read.
///
/// Allowed directions are expressed from the core issue's side. A link read
/// off the dependent issue points the other way, so its direction is
/// reversed before the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewpoint {
    /// The link is stored on the core issue.
    Holder,
    /// The link is stored on the issue at the other end of a core link.
    Peer,
}

/// Outcome of classifying one link record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass<'a> {
    /// Counts as a dependency edge to this key.
    Authoritative(&'a str),
    /// Excluded by the ignored id/name lists.
    Ignored,
    /// Type or direction not in the allowed set.
    NotDependency,
    /// The record names no opposite endpoint.
    NoEndpoint,
}

/// Link matching configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPolicy {
    allowed_type_ids: Vec<String>,
    allowed_names: BTreeSet<String>,
    allowed_directions: BTreeSet<LinkDirection>,
    ignored_type_ids: BTreeSet<String>,
    ignored_names: BTreeSet<String>,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            allowed_type_ids: Vec::new(),
            allowed_names: DEFAULT_LINK_NAMES.iter().map(ToString::to_string).collect(),
            allowed_directions: [LinkDirection::Inward, LinkDirection::Outward]
                .into_iter()
                .collect(),
            ignored_type_ids: BTreeSet::new(),
            ignored_names: DEFAULT_IGNORED_LINK_NAMES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

fn normalize_names<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn normalize_ids<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ids: Vec<String> = Vec::new();
    for value in values {
        let id = value.as_ref().trim();
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

impl LinkPolicy {
    /// Build a policy from raw configuration values.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if no direction is allowed.
    pub fn new<S: AsRef<str>>(
        allowed_type_ids: &[S],
        allowed_names: &[S],
        allowed_directions: &[LinkDirection],
        ignored_type_ids: &[S],
        ignored_names: &[S],
    ) -> Result<Self> {
        if allowed_directions.is_empty() {
            return Err(SyncError::validation(
                "link_directions",
                "must include at least one of: inward, outward",
            ));
        }

        Ok(Self {
            allowed_type_ids: normalize_ids(allowed_type_ids),
            allowed_names: normalize_names(allowed_names),
            allowed_directions: allowed_directions.iter().copied().collect(),
            ignored_type_ids: normalize_ids(ignored_type_ids).into_iter().collect(),
            ignored_names: normalize_names(ignored_names),
        })
    }

    #[must_use]
    pub fn mode(&self) -> LinkMatchMode {
        if self.allowed_type_ids.is_empty() {
            LinkMatchMode::ByName
        } else {
            LinkMatchMode::ById
        }
    }

    #[must_use]
    pub fn allowed_type_ids(&self) -> &[String] {
        &self.allowed_type_ids
    }

    #[must_use]
    pub const fn allowed_names(&self) -> &BTreeSet<String> {
        &self.allowed_names
    }

    #[must_use]
    pub const fn allowed_directions(&self) -> &BTreeSet<LinkDirection> {
        &self.allowed_directions
    }

    #[must_use]
    pub const fn ignored_type_ids(&self) -> &BTreeSet<String> {
        &self.ignored_type_ids
    }

    #[must_use]
    pub const fn ignored_names(&self) -> &BTreeSet<String> {
        &self.ignored_names
    }

    fn phrases(link: &IssueLink) -> [String; 3] {
        let link_type = &link.link_type;
        [
            link_type.name.trim().to_lowercase(),
            link_type.inward.trim().to_lowercase(),
            link_type.outward.trim().to_lowercase(),
        ]
    }

    fn is_ignored(&self, link: &IssueLink) -> bool {
        if self.ignored_type_ids.contains(link.link_type.id.trim()) {
            return true;
        }
        Self::phrases(link)
            .iter()
            .any(|phrase| !phrase.is_empty() && self.ignored_names.contains(phrase))
    }

    fn type_allowed(&self, link: &IssueLink) -> bool {
        match self.mode() {
            LinkMatchMode::ById => {
                let id = link.link_type.id.trim();
                self.allowed_type_ids.iter().any(|allowed| allowed == id)
            }
            LinkMatchMode::ByName => Self::phrases(link)
                .iter()
                .any(|phrase| !phrase.is_empty() && self.allowed_names.contains(phrase)),
        }
    }

    /// Classify one link record read from `viewpoint`.
    #[must_use]
    pub fn classify<'a>(&self, link: &'a IssueLink, viewpoint: Viewpoint) -> LinkClass<'a> {
        let (Some(key), Some(direction)) = (link.linked_key(), link.direction()) else {
            return LinkClass::NoEndpoint;
        };

        if self.is_ignored(link) {
            return LinkClass::Ignored;
        }

        let direction = match viewpoint {
            Viewpoint::Holder => direction,
            Viewpoint::Peer => direction.reversed(),
        };

        if self.type_allowed(link) && self.allowed_directions.contains(&direction) {
            LinkClass::Authoritative(key)
        } else {
            LinkClass::NotDependency
        }
    }

    /// The opposite-end key if the link is authoritative.
    #[must_use]
    pub fn authoritative_key<'a>(&self, link: &'a IssueLink, viewpoint: Viewpoint) -> Option<&'a str> {
        match self.classify(link, viewpoint) {
            LinkClass::Authoritative(key) => Some(key),
            _ => None,
        }
    }

    /// All distinct keys an issue is authoritatively linked to.
    #[must_use]
    pub fn linked_keys<'a>(&self, issue: &'a Issue, viewpoint: Viewpoint) -> BTreeSet<&'a str> {
        issue
            .links()
            .iter()
            .filter_map(|link| self.authoritative_key(link, viewpoint))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkType;

    fn blocks() -> LinkType {
        LinkType {
            id: "10000".into(),
            name: "Blocks".into(),
            inward: "is blocked by".into(),
            outward: "blocks".into(),
        }
    }

    fn cloners() -> LinkType {
        LinkType {
            id: "10001".into(),
            name: "Cloners".into(),
            inward: "is cloned by".into(),
            outward: "clones".into(),
        }
    }

    fn relates() -> LinkType {
        LinkType {
            id: "10003".into(),
            name: "Relates".into(),
            inward: "relates to".into(),
            outward: "relates to".into(),
        }
    }

    fn policy_by_id(ids: &[&str], directions: &[LinkDirection]) -> LinkPolicy {
        LinkPolicy::new(ids, &["blocks"], directions, &[], &["clones", "is cloned by"]).unwrap()
    }

    #[test]
    fn test_default_policy_matches_dependency_phrases() {
        let policy = LinkPolicy::default();
        assert_eq!(policy.mode(), LinkMatchMode::ByName);
        let link = IssueLink::outward(blocks(), "EXT-1");
        assert_eq!(
            policy.classify(&link, Viewpoint::Holder),
            LinkClass::Authoritative("EXT-1")
        );
        let link = IssueLink::inward(blocks(), "EXT-2");
        assert_eq!(policy.authoritative_key(&link, Viewpoint::Holder), Some("EXT-2"));
    }

    #[test]
    fn test_clone_links_are_ignored() {
        let policy = LinkPolicy::default();
        let link = IssueLink::outward(cloners(), "EXT-1");
        assert_eq!(policy.classify(&link, Viewpoint::Holder), LinkClass::Ignored);
    }

    #[test]
    fn test_ignored_name_beats_dependency_phrase() {
        // A custom type whose outward phrase looks like a dependency but whose
        // inward phrase is a clone phrase.
        let policy = LinkPolicy::default();
        let sneaky = LinkType {
            id: "20000".into(),
            name: "Copy".into(),
            inward: "is cloned by".into(),
            outward: "blocks".into(),
        };
        let link = IssueLink::outward(sneaky, "EXT-1");
        assert_eq!(policy.classify(&link, Viewpoint::Holder), LinkClass::Ignored);
    }

    #[test]
    fn test_ignored_type_id_wins_over_allow_list() {
        let policy = LinkPolicy::new(
            &["10000"],
            &[],
            &[LinkDirection::Inward, LinkDirection::Outward],
            &["10000"],
            &[],
        )
        .unwrap();
        let link = IssueLink::outward(blocks(), "EXT-1");
        assert_eq!(policy.classify(&link, Viewpoint::Holder), LinkClass::Ignored);
    }

    #[test]
    fn test_unrelated_link_type_is_not_dependency() {
        let policy = LinkPolicy::default();
        let link = IssueLink::outward(relates(), "EXT-1");
        assert_eq!(policy.classify(&link, Viewpoint::Holder), LinkClass::NotDependency);
    }

    #[test]
    fn test_id_mode_bypasses_names() {
        // "Relates" is not a dependency name, but its id is allow-listed.
        let policy = policy_by_id(&["10003"], &[LinkDirection::Outward]);
        assert_eq!(policy.mode(), LinkMatchMode::ById);
        let related = IssueLink::outward(relates(), "EXT-1");
        assert_eq!(policy.authoritative_key(&related, Viewpoint::Holder), Some("EXT-1"));

        // "Blocks" matches by name but not by id.
        let blocking = IssueLink::outward(blocks(), "EXT-2");
        assert_eq!(
            policy.classify(&blocking, Viewpoint::Holder),
            LinkClass::NotDependency
        );
    }

    #[test]
    fn test_direction_filter_and_peer_viewpoint() {
        let policy = policy_by_id(&["10000"], &[LinkDirection::Outward]);
        let on_core = IssueLink::outward(blocks(), "EXT-1");
        let on_dependent = IssueLink::inward(blocks(), "CORE-1");

        assert_eq!(policy.authoritative_key(&on_core, Viewpoint::Holder), Some("EXT-1"));
        assert_eq!(policy.authoritative_key(&on_dependent, Viewpoint::Holder), None);
        assert_eq!(
            policy.authoritative_key(&on_dependent, Viewpoint::Peer),
            Some("CORE-1")
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let policy = LinkPolicy::default();
        let link = IssueLink {
            link_type: blocks(),
            ..Default::default()
        };
        assert_eq!(policy.classify(&link, Viewpoint::Holder), LinkClass::NoEndpoint);
    }

    #[test]
    fn test_linked_keys_dedupes() {
        let policy = LinkPolicy::default();
        let issue = Issue::new("CORE-1")
            .with_link(IssueLink::outward(blocks(), "EXT-1"))
            .with_link(IssueLink::inward(blocks(), "EXT-1"))
            .with_link(IssueLink::outward(cloners(), "EXT-2"))
            .with_link(IssueLink::outward(blocks(), "EXT-3"));
        let keys: Vec<&str> = policy.linked_keys(&issue, Viewpoint::Holder).into_iter().collect();
        assert_eq!(keys, ["EXT-1", "EXT-3"]);
    }

    #[test]
    fn test_requires_a_direction() {
        let result = LinkPolicy::new::<&str>(&[], &["blocks"], &[], &[], &[]);
        assert!(matches!(result, Err(SyncError::Validation { .. })));
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let policy = LinkPolicy::new(
            &[],
            &["  DEPENDS ON "],
            &[LinkDirection::Inward, LinkDirection::Outward],
            &[],
            &[],
        )
        .unwrap();
        let link = IssueLink::outward(
            LinkType {
                id: "1".into(),
                name: "Dependency".into(),
                inward: "Is Depended On By".into(),
                outward: "Depends On".into(),
            },
            "EXT-9",
        );
        assert_eq!(policy.authoritative_key(&link, Viewpoint::Holder), Some("EXT-9"));
    }
}
