use deplabel_lib::model::LinkType;
use deplabel_lib::{
    IgnoredStatusPolicy, InMemoryTracker, Issue, IssueLink, PaginationStyle, ScopeSelector, SyncSettings, TrackedLabels,
};

pub const CORE_JQL: &str = "project = CORE";
pub const CANONICAL: &str = "DFS_CORE_Dependencies";
pub const ALIAS: &str = "DFS_Old";

pub fn blocks() -> LinkType {
    LinkType {
        id: "10000".into(),
        name: "Blocks".into(),
        inward: "is blocked by".into(),
        outward: "blocks".into(),
    }
}

pub fn cloners() -> LinkType {
    LinkType {
        id: "10001".into(),
        name: "Cloners".into(),
        inward: "is cloned by".into(),
        outward: "clones".into(),
    }
}

pub fn relates() -> LinkType {
    LinkType {
        id: "10003".into(),
        name: "Relates".into(),
        inward: "relates to".into(),
        outward: "relates to".into(),
    }
}

/// Default-style settings: literal core JQL, one alias, Canceled ignored,
/// core types Initiative/Epic/Story.
pub fn settings() -> SyncSettings {
    let mut settings = SyncSettings::new(
        ScopeSelector::LiteralQuery(CORE_JQL.into()),
        TrackedLabels::new(CANONICAL, [ALIAS]).expect("valid labels"),
    );
    settings.core_issue_types = vec!["Initiative".into(), "Epic".into(), "Story".into()];
    settings.ignored_statuses = vec!["Canceled".into()];
    settings
}

/// Register the core query and the labeled-scope query for `settings`.
pub fn register_queries(tracker: &InMemoryTracker, settings: &SyncSettings) {
    tracker.register_query(CORE_JQL, |issue| issue.key.starts_with("CORE-"));

    let tracked = settings.labels.clone();
    let excluded: Vec<String> = if settings.ignored_status_policy == IgnoredStatusPolicy::Freeze {
        settings.ignored_statuses.clone()
    } else {
        Vec::new()
    };
    tracker.register_query(&settings.labeled_scope_jql(), move |issue| {
        let status = issue.status_name().to_lowercase();
        !excluded.iter().any(|ignored| ignored.to_lowercase() == status)
            && issue.labels().iter().any(|label| tracked.is_tracked(label))
    });
}

pub fn tracker(style: PaginationStyle, settings: &SyncSettings) -> InMemoryTracker {
    let tracker = InMemoryTracker::new().with_style(style);
    register_queries(&tracker, settings);
    tracker
}

/// Link `core` to `other` on both issues, `core` holding the outward side.
pub fn link_outward(tracker: &InMemoryTracker, core: &str, other: &str, link_type: &LinkType) {
    add_link(tracker, core, IssueLink::outward(link_type.clone(), other));
    add_link(tracker, other, IssueLink::inward(link_type.clone(), core));
}

/// Link `core` to `other` on both issues, `core` holding the inward side.
pub fn link_inward(tracker: &InMemoryTracker, core: &str, other: &str, link_type: &LinkType) {
    add_link(tracker, core, IssueLink::inward(link_type.clone(), other));
    add_link(tracker, other, IssueLink::outward(link_type.clone(), core));
}

fn add_link(tracker: &InMemoryTracker, key: &str, link: IssueLink) {
    let issue = tracker
        .issue(key)
        .unwrap_or_else(|| panic!("fixture issue {key} must be inserted before linking"));
    tracker.insert(issue.with_link(link));
}

pub fn core_issue(key: &str, issue_type: &str) -> Issue {
    Issue::new(key).with_type(issue_type).with_status("In Progress")
}

pub fn external(key: &str, labels: &[&str]) -> Issue {
    Issue::new(key)
        .with_type("Task")
        .with_status("Open")
        .with_labels(labels.iter().copied())
}
