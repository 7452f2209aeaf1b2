//! Commit-level view over per-file change events.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use vitals_core::ChangeEvent;

/// All changes of one commit, merged.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitGroup {
    pub hash: String,
    /// Earliest timestamp seen for the commit.
    pub timestamp: DateTime<Utc>,
    /// Distinct files touched.
    pub files: BTreeSet<String>,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

impl CommitGroup {
    pub fn churn(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

/// Group events by `commit_hash`, ordered by timestamp then hash.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::ChangeEvent;
/// use vitals_gitpulse::commits::group_by_commit;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let event = |file: &str| ChangeEvent {
///     commit_hash: "c1".into(),
///     timestamp: at,
///     file_path: file.into(),
///     lines_added: 4,
///     lines_deleted: 1,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// };
/// let commits = group_by_commit(&[event("a.rs"), event("b.rs")]);
/// assert_eq!(commits.len(), 1);
/// assert_eq!(commits[0].files.len(), 2);
/// assert_eq!(commits[0].churn(), 10);
/// ```
pub fn group_by_commit(events: &[ChangeEvent]) -> Vec<CommitGroup> {
    let mut groups: BTreeMap<&str, CommitGroup> = BTreeMap::new();

    for event in events {
        let group = groups
            .entry(event.commit_hash.as_str())
            .or_insert_with(|| CommitGroup {
                hash: event.commit_hash.clone(),
                timestamp: event.timestamp,
                files: BTreeSet::new(),
                lines_added: 0,
                lines_deleted: 0,
            });
        if event.timestamp < group.timestamp {
            group.timestamp = event.timestamp;
        }
        group.files.insert(event.file_path.clone());
        group.lines_added += event.lines_added;
        group.lines_deleted += event.lines_deleted;
    }

    let mut commits: Vec<CommitGroup> = groups.into_values().collect();
    commits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.hash.cmp(&b.hash)));
    commits
}
