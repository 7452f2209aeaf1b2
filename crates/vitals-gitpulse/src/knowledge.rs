//! Knowledge concentration and bus factor analysis.
//!
//! Measures how author contributions are distributed per file. Two
//! signals are kept apart on purpose: the primary author comes from raw
//! churn shares (who wrote the file), while the concentration index comes
//! from recency-weighted shares (who knows it now).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vitals_core::math::recency_weight;
use vitals_core::{AnalysisWindow, ChangeEvent, KnowledgeConfig};

/// Per-author contribution to a file.
///
/// # Examples
///
/// ```
/// use vitals_gitpulse::knowledge::AuthorContribution;
///
/// let contrib = AuthorContribution {
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     change_count: 15,
///     total_churn: 900,
///     proportion: 0.75,
///     weighted_proportion: 0.6,
/// };
/// assert!(contrib.proportion > 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorContribution {
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Commits by this author touching the file.
    pub change_count: u32,
    /// Lines added + deleted by this author.
    pub total_churn: u64,
    /// Raw churn share; sums to 1.0 across the file's authors.
    pub proportion: f64,
    /// Recency-weighted churn share; sums to 1.0 across the file's authors.
    pub weighted_proportion: f64,
}

/// Knowledge metrics for a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileKnowledge {
    /// File path relative to repo root.
    pub file_path: String,
    /// `1 - H(weighted shares) / log2(n_authors)`, in `[0, 1]`.
    pub knowledge_concentration: f64,
    /// Author with the highest raw share.
    pub primary_author: String,
    /// Raw share of the primary author.
    pub primary_author_pct: f64,
    /// Whether `primary_author_pct` exceeds the island threshold.
    pub is_knowledge_island: bool,
    /// Contributions sorted by raw share descending.
    pub authors: Vec<AuthorContribution>,
}

/// Summary of knowledge distribution across the window.
///
/// # Examples
///
/// ```
/// use vitals_gitpulse::knowledge::KnowledgeReport;
///
/// let report = KnowledgeReport {
///     files: vec![],
///     developer_risk_index: 2,
///     knowledge_islands: 4,
///     single_author_files: 3,
/// };
/// assert_eq!(report.developer_risk_index, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeReport {
    /// Per-file knowledge, most concentrated first.
    pub files: Vec<FileKnowledge>,
    /// Bus factor: fewest authors covering more than half of all churn.
    pub developer_risk_index: u32,
    /// Files flagged as knowledge islands.
    pub knowledge_islands: usize,
    /// Files with exactly one author.
    pub single_author_files: usize,
}

impl KnowledgeReport {
    pub fn get(&self, file_path: &str) -> Option<&FileKnowledge> {
        self.files.iter().find(|f| f.file_path == file_path)
    }
}

#[derive(Default)]
struct AuthorAccumulator {
    name: String,
    commits: BTreeSet<String>,
    churn: u64,
    weighted_churn: f64,
    weighted_commits: f64,
}

/// Analyze author contribution shares per file.
///
/// When a file's churn is all zero (pure renames, binary touches), shares
/// fall back to change counts so that they still sum to 1.0.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::{AnalysisWindow, ChangeEvent, KnowledgeConfig};
/// use vitals_gitpulse::knowledge::analyze_knowledge;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let events = vec![ChangeEvent {
///     commit_hash: "c1".into(),
///     timestamp: now,
///     file_path: "main.rs".into(),
///     lines_added: 50,
///     lines_deleted: 0,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// }];
/// let window = AnalysisWindow::ending_at(now, 90);
/// let report = analyze_knowledge(&events, &window, &KnowledgeConfig::default());
/// assert_eq!(report.files[0].knowledge_concentration, 1.0);
/// assert_eq!(report.developer_risk_index, 1);
/// ```
pub fn analyze_knowledge(
    events: &[ChangeEvent],
    window: &AnalysisWindow,
    config: &KnowledgeConfig,
) -> KnowledgeReport {
    // file -> author email -> accumulator
    let mut per_file: BTreeMap<&str, BTreeMap<&str, AuthorAccumulator>> = BTreeMap::new();

    for event in events {
        let weight = recency_weight(window.age_days(event.timestamp), config.half_life_days);
        let acc = per_file
            .entry(event.file_path.as_str())
            .or_default()
            .entry(event.author_email.as_str())
            .or_default();
        if acc.name.is_empty() {
            acc.name = event.author_name.clone();
        }
        if acc.commits.insert(event.commit_hash.clone()) {
            acc.weighted_commits += weight;
        }
        acc.churn += event.churn();
        acc.weighted_churn += event.churn() as f64 * weight;
    }

    let mut files: Vec<FileKnowledge> = per_file
        .into_iter()
        .map(|(path, authors)| file_knowledge(path, &authors, config.island_threshold))
        .collect();

    files.sort_by(|a, b| {
        b.knowledge_concentration
            .total_cmp(&a.knowledge_concentration)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    let knowledge_islands = files.iter().filter(|f| f.is_knowledge_island).count();
    let single_author_files = files.iter().filter(|f| f.authors.len() == 1).count();
    let developer_risk_index = developer_risk_index(events);

    debug!(
        files = files.len(),
        knowledge_islands,
        developer_risk_index,
        "knowledge analysis complete"
    );

    KnowledgeReport {
        files,
        developer_risk_index,
        knowledge_islands,
        single_author_files,
    }
}

fn file_knowledge(
    path: &str,
    authors: &BTreeMap<&str, AuthorAccumulator>,
    island_threshold: f64,
) -> FileKnowledge {
    let raw: Vec<f64> = authors.values().map(|a| a.churn as f64).collect();
    let counts: Vec<f64> = authors.values().map(|a| a.commits.len() as f64).collect();
    let weighted: Vec<f64> = authors.values().map(|a| a.weighted_churn).collect();
    let weighted_counts: Vec<f64> = authors.values().map(|a| a.weighted_commits).collect();

    let proportions = shares(&raw).unwrap_or_else(|| shares(&counts).unwrap_or_default());
    let weighted_proportions =
        shares(&weighted).unwrap_or_else(|| shares(&weighted_counts).unwrap_or_default());

    let mut contributions: Vec<AuthorContribution> = authors
        .iter()
        .zip(proportions.iter().zip(&weighted_proportions))
        .map(|((email, acc), (p, wp))| AuthorContribution {
            author: acc.name.clone(),
            email: (*email).to_string(),
            change_count: acc.commits.len() as u32,
            total_churn: acc.churn,
            proportion: *p,
            weighted_proportion: *wp,
        })
        .collect();

    contributions.sort_by(|a, b| {
        b.proportion
            .total_cmp(&a.proportion)
            .then_with(|| a.author.cmp(&b.author))
    });

    let (primary_author, primary_author_pct) = contributions
        .first()
        .map(|c| (c.author.clone(), c.proportion))
        .unwrap_or_default();

    FileKnowledge {
        file_path: path.to_string(),
        knowledge_concentration: knowledge_concentration(&weighted_proportions),
        primary_author,
        primary_author_pct,
        is_knowledge_island: primary_author_pct > island_threshold,
        authors: contributions,
    }
}

/// Normalize to shares; `None` when the total is zero.
fn shares(values: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        Some(values.iter().map(|v| v / total).collect())
    } else {
        None
    }
}

/// Knowledge distribution index: one minus normalized Shannon entropy.
///
/// A single author is fully concentrated (1.0); equal shares are fully
/// spread (0.0).
///
/// # Examples
///
/// ```
/// use vitals_gitpulse::knowledge::knowledge_concentration;
///
/// assert_eq!(knowledge_concentration(&[1.0]), 1.0);
/// assert_eq!(knowledge_concentration(&[0.5, 0.5]), 0.0);
/// assert!(knowledge_concentration(&[0.9, 0.1]) > 0.5);
/// ```
pub fn knowledge_concentration(shares: &[f64]) -> f64 {
    if shares.len() <= 1 {
        return 1.0;
    }
    let entropy: f64 = shares
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    let max_entropy = (shares.len() as f64).log2();
    (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
}

/// Fewest authors, taken by descending churn, whose cumulative churn
/// exceeds half of the total. Falls back to change counts when all churn
/// is zero; empty input gives 0.
pub fn developer_risk_index(events: &[ChangeEvent]) -> u32 {
    let mut churn: BTreeMap<&str, u64> = BTreeMap::new();
    let mut commits: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for event in events {
        *churn.entry(event.author_email.as_str()).or_default() += event.churn();
        commits
            .entry(event.author_email.as_str())
            .or_default()
            .insert(event.commit_hash.as_str());
    }

    let total_churn: u64 = churn.values().sum();
    let mut totals: Vec<u64> = if total_churn > 0 {
        churn.into_values().collect()
    } else {
        commits.values().map(|c| c.len() as u64).collect()
    };
    totals.sort_unstable_by(|a, b| b.cmp(a));

    let total: u64 = totals.iter().sum();
    let half = total as f64 / 2.0;
    let mut cumulative = 0u64;
    for (i, value) in totals.iter().enumerate() {
        cumulative += value;
        if cumulative as f64 > half {
            return (i + 1) as u32;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn change(author: &str, hash: &str, days_ago: i64, file: &str, churn: u64) -> ChangeEvent {
        ChangeEvent {
            commit_hash: hash.into(),
            timestamp: now() - Duration::days(days_ago),
            file_path: file.into(),
            lines_added: churn,
            lines_deleted: 0,
            author_name: author.into(),
            author_email: format!("{author}@example.com"),
        }
    }

    fn analyze(events: &[ChangeEvent]) -> KnowledgeReport {
        let window = AnalysisWindow::ending_at(now(), 90);
        analyze_knowledge(events, &window, &KnowledgeConfig::default())
    }

    #[test]
    fn proportions_sum_to_one() {
        let events = vec![
            change("alice", "c1", 10, "main.rs", 30),
            change("bob", "c2", 40, "main.rs", 50),
            change("carol", "c3", 70, "main.rs", 20),
        ];
        let report = analyze(&events);
        let file = &report.files[0];
        let raw: f64 = file.authors.iter().map(|a| a.proportion).sum();
        let weighted: f64 = file.authors.iter().map(|a| a.weighted_proportion).sum();
        assert!((raw - 1.0).abs() < 1e-9);
        assert!((weighted - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_author_file_is_island_with_full_concentration() {
        let events = vec![
            change("alice", "c1", 1, "main.rs", 5),
            change("alice", "c2", 2, "main.rs", 5),
        ];
        let report = analyze(&events);
        let file = &report.files[0];
        assert_eq!(file.knowledge_concentration, 1.0);
        assert!(file.is_knowledge_island);
        assert_eq!(file.primary_author, "alice");
        assert_eq!(report.single_author_files, 1);
        assert_eq!(report.knowledge_islands, 1);
    }

    #[test]
    fn equal_weighted_shares_have_zero_concentration() {
        let events = vec![
            change("alice", "c1", 5, "main.rs", 10),
            change("bob", "c2", 5, "main.rs", 10),
        ];
        let report = analyze(&events);
        let file = &report.files[0];
        assert_eq!(file.knowledge_concentration, 0.0);
        assert!(!file.is_knowledge_island);
    }

    #[test]
    fn primary_author_uses_raw_share_while_concentration_uses_recency() {
        // alice wrote most of the file long ago, bob touched it yesterday
        let events = vec![
            change("alice", "c1", 89, "main.rs", 90),
            change("bob", "c2", 1, "main.rs", 10),
        ];
        let report = analyze(&events);
        let file = &report.files[0];
        assert_eq!(file.primary_author, "alice");
        assert!((file.primary_author_pct - 0.9).abs() < 1e-12);
        assert!(file.is_knowledge_island);
        let bob = file.authors.iter().find(|a| a.author == "bob").unwrap();
        assert!(bob.weighted_proportion > bob.proportion);
    }

    #[test]
    fn zero_churn_falls_back_to_change_counts() {
        let events = vec![
            change("alice", "c1", 1, "logo.png", 0),
            change("alice", "c2", 1, "logo.png", 0),
            change("bob", "c3", 1, "logo.png", 0),
        ];
        let report = analyze(&events);
        let alice = &report.files[0].authors[0];
        assert_eq!(alice.author, "alice");
        assert!((alice.proportion - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn developer_risk_index_counts_authors_past_half() {
        let events = vec![
            change("alice", "c1", 1, "a.rs", 40),
            change("bob", "c2", 1, "b.rs", 35),
            change("carol", "c3", 1, "c.rs", 25),
        ];
        // 40 is not > 50, 40 + 35 = 75 is
        assert_eq!(developer_risk_index(&events), 2);

        let dominant = vec![
            change("alice", "c1", 1, "a.rs", 60),
            change("bob", "c2", 1, "b.rs", 40),
        ];
        assert_eq!(developer_risk_index(&dominant), 1);
    }

    #[test]
    fn empty_input_has_zero_risk_index() {
        let report = analyze(&[]);
        assert!(report.files.is_empty());
        assert_eq!(report.developer_risk_index, 0);
    }
}
