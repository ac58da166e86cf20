//! Case-insensitive labels and the tracked label set.
//!
//! Label equality ignores case, but the original spelling is kept so that
//! whatever goes into an update request matches what the tracker stores.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SyncError};

/// A label compared by its lowercased form.
#[derive(Debug, Clone)]
pub struct Label {
    original: String,
    folded: String,
}

impl Label {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let original = value.into().trim().to_string();
        let folded = original.to_lowercase();
        Self { original, folded }
    }

    /// The spelling to write back to the tracker.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Case-insensitive comparison against a raw label string.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        self.folded == raw.trim().to_lowercase()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Which tracked labels are present on one issue, in the issue's own spelling.
///
/// The tracker stores labels case-sensitively, so one issue can carry several
/// spellings of the same tracked label. Each distinct spelling is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPresence {
    pub canonical: Vec<Label>,
    pub aliases: Vec<Label>,
}

impl LabelPresence {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty() && self.aliases.is_empty()
    }

    #[must_use]
    pub fn has_canonical(&self) -> bool {
        !self.canonical.is_empty()
    }

    /// Every tracked spelling present, canonical spellings first.
    #[must_use]
    pub fn all(&self) -> Vec<Label> {
        self.canonical
            .iter()
            .chain(self.aliases.iter())
            .cloned()
            .collect()
    }
}

fn push_spelling(found: &mut Vec<Label>, raw: &str) {
    let label = Label::new(raw);
    if !found.iter().any(|seen| seen.as_str() == label.as_str()) {
        found.push(label);
    }
}

/// The canonical label plus its known aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedLabels {
    canonical: Label,
    aliases: Vec<Label>,
}

impl TrackedLabels {
    /// Build the set, dropping aliases that repeat each other or the
    /// canonical label (case-insensitively). First spelling wins.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the canonical label is blank.
    pub fn new<I, S>(canonical: impl Into<String>, aliases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = Label::new(canonical);
        if canonical.is_empty() {
            return Err(SyncError::validation("dependency_label", "cannot be empty"));
        }

        let mut deduped: Vec<Label> = Vec::new();
        for alias in aliases {
            let alias = Label::new(alias);
            if alias.is_empty() || alias == canonical || deduped.contains(&alias) {
                continue;
            }
            deduped.push(alias);
        }

        Ok(Self {
            canonical,
            aliases: deduped,
        })
    }

    #[must_use]
    pub const fn canonical(&self) -> &Label {
        &self.canonical
    }

    #[must_use]
    pub fn aliases(&self) -> &[Label] {
        &self.aliases
    }

    /// Canonical label first, then aliases in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        std::iter::once(&self.canonical).chain(self.aliases.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.aliases.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_tracked(&self, raw: &str) -> bool {
        self.iter().any(|label| label.matches(raw))
    }

    /// Classify an issue's current labels against the tracked set.
    #[must_use]
    pub fn presence(&self, labels: &[String]) -> LabelPresence {
        let mut presence = LabelPresence::default();
        for raw in labels {
            if self.canonical.matches(raw) {
                push_spelling(&mut presence.canonical, raw);
            } else if self.aliases.iter().any(|alias| alias.matches(raw)) {
                push_spelling(&mut presence.aliases, raw);
            }
        }
        presence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_label_equality_ignores_case() {
        let a = Label::new("DFS_CORE_Dependencies");
        let b = Label::new("dfs_core_dependencies");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "DFS_CORE_Dependencies");
        assert_eq!(b.as_str(), "dfs_core_dependencies");

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_label_ordering_is_consistent_with_equality() {
        let set: BTreeSet<Label> = ["beta", "Alpha", "ALPHA", "gamma"]
            .into_iter()
            .map(Label::from)
            .collect();
        let ordered: Vec<&str> = set.iter().map(Label::as_str).collect();
        assert_eq!(ordered, ["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_label_serializes_original_spelling() {
        let json = serde_json::to_string(&Label::new("  MixedCase ")).unwrap();
        assert_eq!(json, r#""MixedCase""#);
    }

    #[test]
    fn test_tracked_labels_dedupe_aliases() {
        let tracked = TrackedLabels::new(
            "DFS_CORE_Dependencies",
            ["dfs_core_dependencies", "DFS_CORE_Dependecies", "dfs_core_dependecies", "", "Old"],
        )
        .unwrap();
        let aliases: Vec<&str> = tracked.aliases().iter().map(Label::as_str).collect();
        assert_eq!(aliases, ["DFS_CORE_Dependecies", "Old"]);
        assert_eq!(tracked.len(), 3);
    }

    #[test]
    fn test_tracked_labels_reject_blank_canonical() {
        let result = TrackedLabels::new("   ", Vec::<String>::new());
        assert!(matches!(result, Err(SyncError::Validation { .. })));
    }

    #[test]
    fn test_presence_keeps_issue_spelling() {
        let tracked = TrackedLabels::new("Canon", ["Alias"]).unwrap();
        let presence = tracked.presence(&labels(&["frontend", "alias", "CANON"]));
        assert_eq!(presence.canonical, [Label::new("CANON")]);
        assert_eq!(presence.canonical[0].as_str(), "CANON");
        assert_eq!(presence.aliases.len(), 1);
        assert_eq!(presence.aliases[0].as_str(), "alias");
        assert_eq!(presence.all().len(), 2);
    }

    #[test]
    fn test_presence_keeps_every_spelling() {
        let tracked = TrackedLabels::new("Canon", ["Alias"]).unwrap();
        let presence = tracked.presence(&labels(&["Canon", "canon", "Canon", "ALIAS", "alias"]));

        let all = presence.all();
        let spellings: Vec<&str> = all.iter().map(Label::as_str).collect();
        assert_eq!(spellings, ["Canon", "canon", "ALIAS", "alias"]);
        assert!(presence.has_canonical());
    }

    #[test]
    fn test_presence_empty_for_untracked_labels() {
        let tracked = TrackedLabels::new("Canon", ["Alias"]).unwrap();
        let presence = tracked.presence(&labels(&["frontend", "backend"]));
        assert!(presence.is_empty());
        assert!(!tracked.is_tracked("frontend"));
        assert!(tracked.is_tracked("ALIAS"));
    }
}
