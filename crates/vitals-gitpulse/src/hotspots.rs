//! Recency-weighted hotspot and rework detection.
//!
//! A hotspot is a file that changes often and changes a lot relative to
//! its size. Both signals are decayed by commit age so that recent work
//! dominates, then max-normalized and multiplied.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vitals_core::math::{max_of, max_ratio, recency_weight};
use vitals_core::{AnalysisWindow, ChangeEvent, HotspotConfig};

const SECONDS_PER_DAY: i64 = 86_400;

/// Hotspot metrics for a single file.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_gitpulse::hotspots::FileMetric;
///
/// let m = FileMetric {
///     file_path: "src/main.rs".into(),
///     change_frequency: 10,
///     code_churn: 500,
///     file_size: Some(2048),
///     hotspot_score: 0.85,
///     rework_ratio: 0.4,
///     weighted_frequency: 6.2,
///     weighted_relative_churn: 0.12,
///     authors: 3,
///     last_modified: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
/// };
/// assert!(m.hotspot_score > 0.0 && m.hotspot_score <= 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetric {
    /// File path relative to repo root.
    pub file_path: String,
    /// Distinct commits touching this file.
    pub change_frequency: u32,
    /// Total lines added + deleted.
    pub code_churn: u64,
    /// Size in bytes, when the change source knows it.
    pub file_size: Option<u64>,
    /// `norm(weighted_frequency) × norm(weighted_relative_churn)`, in `[0, 1]`.
    pub hotspot_score: f64,
    /// Quick follow-up commits / total commits.
    pub rework_ratio: f64,
    /// Sum of recency weights over this file's commits.
    pub weighted_frequency: f64,
    /// Recency-weighted churn divided by file size (raw churn when size is unknown).
    pub weighted_relative_churn: f64,
    /// Distinct authors.
    pub authors: u32,
    /// Most recent change.
    pub last_modified: DateTime<Utc>,
}

/// Hotspot report for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReport {
    pub window: AnalysisWindow,
    /// Distinct commits in the input.
    pub total_commits: usize,
    /// Files sorted by `hotspot_score` descending.
    pub files: Vec<FileMetric>,
}

impl HotspotReport {
    pub fn get(&self, file_path: &str) -> Option<&FileMetric> {
        self.files.iter().find(|f| f.file_path == file_path)
    }
}

#[derive(Default)]
struct FileAccumulator {
    /// commit hash -> commit time
    commits: BTreeMap<String, DateTime<Utc>>,
    churn: u64,
    weighted_churn: f64,
    authors: BTreeSet<String>,
}

/// Score every file touched by `events`.
///
/// `events` are expected to be scoped to `window`; ages are measured from
/// `window.to`. Empty input yields an empty report.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use chrono::{Duration, TimeZone, Utc};
/// use vitals_core::{AnalysisWindow, ChangeEvent, HotspotConfig};
/// use vitals_gitpulse::hotspots::analyze_hotspots;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let window = AnalysisWindow::ending_at(now, 90);
/// let change = |hash: &str, days_ago: i64, added: u64, deleted: u64| ChangeEvent {
///     commit_hash: hash.into(),
///     timestamp: now - Duration::days(days_ago),
///     file_path: "a.py".into(),
///     lines_added: added,
///     lines_deleted: deleted,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// };
/// let events = vec![change("c1", 10, 10, 5), change("c2", 3, 20, 10)];
///
/// let report = analyze_hotspots(&events, &window, &HashMap::new(), &HotspotConfig::default());
/// let a = report.get("a.py").unwrap();
/// assert_eq!(a.change_frequency, 2);
/// assert_eq!(a.code_churn, 45);
/// assert_eq!(a.hotspot_score, 1.0);
/// ```
pub fn analyze_hotspots(
    events: &[ChangeEvent],
    window: &AnalysisWindow,
    file_sizes: &HashMap<String, u64>,
    config: &HotspotConfig,
) -> HotspotReport {
    let mut per_file: BTreeMap<&str, FileAccumulator> = BTreeMap::new();
    let mut all_commits: BTreeSet<&str> = BTreeSet::new();

    for event in events {
        all_commits.insert(event.commit_hash.as_str());
        let acc = per_file.entry(event.file_path.as_str()).or_default();
        let weight = recency_weight(window.age_days(event.timestamp), config.half_life_days);

        acc.commits
            .entry(event.commit_hash.clone())
            .and_modify(|ts| *ts = (*ts).min(event.timestamp))
            .or_insert(event.timestamp);
        acc.churn += event.churn();
        acc.weighted_churn += event.churn() as f64 * weight;
        acc.authors.insert(event.author_email.clone());
    }

    let mut files: Vec<FileMetric> = per_file
        .into_iter()
        .map(|(path, acc)| {
            let file_size = file_sizes.get(path).copied();
            let weighted_frequency: f64 = acc
                .commits
                .values()
                .map(|ts| recency_weight(window.age_days(*ts), config.half_life_days))
                .sum();
            let weighted_relative_churn = match file_size {
                Some(size) if size > 0 => acc.weighted_churn / size as f64,
                _ => acc.weighted_churn,
            };
            let dates: Vec<DateTime<Utc>> = acc.commits.values().copied().collect();

            FileMetric {
                file_path: path.to_string(),
                change_frequency: acc.commits.len() as u32,
                code_churn: acc.churn,
                file_size,
                hotspot_score: 0.0, // normalized below
                rework_ratio: rework_ratio(&dates, config.rework_window_days),
                weighted_frequency,
                weighted_relative_churn,
                authors: acc.authors.len() as u32,
                last_modified: dates.iter().copied().max().unwrap_or(window.to),
            }
        })
        .collect();

    let max_freq = max_of(files.iter().map(|f| f.weighted_frequency));
    let max_churn = max_of(files.iter().map(|f| f.weighted_relative_churn));

    for file in &mut files {
        file.hotspot_score = max_ratio(file.weighted_frequency, max_freq)
            * max_ratio(file.weighted_relative_churn, max_churn);
    }

    files.sort_by(|a, b| {
        b.hotspot_score
            .total_cmp(&a.hotspot_score)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    debug!(
        files = files.len(),
        commits = all_commits.len(),
        "hotspot analysis complete"
    );

    HotspotReport {
        window: *window,
        total_commits: all_commits.len(),
        files,
    }
}

/// Share of a file's commits that follow the previous one within
/// `window_days`.
///
/// The denominator is the commit count, not the gap count, so a file with
/// a single commit scores 0.0.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use vitals_gitpulse::hotspots::rework_ratio;
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let dates = [t0, t0 + Duration::days(3), t0 + Duration::days(40)];
/// assert!((rework_ratio(&dates, 14) - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn rework_ratio(dates: &[DateTime<Utc>], window_days: u32) -> f64 {
    if dates.is_empty() {
        return 0.0;
    }
    let mut sorted = dates.to_vec();
    sorted.sort();

    let limit = i64::from(window_days) * SECONDS_PER_DAY;
    let quick = sorted
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).num_seconds() <= limit)
        .count();

    quick as f64 / sorted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn change(hash: &str, days_ago: i64, file: &str, added: u64, deleted: u64) -> ChangeEvent {
        ChangeEvent {
            commit_hash: hash.into(),
            timestamp: now() - Duration::days(days_ago),
            file_path: file.into(),
            lines_added: added,
            lines_deleted: deleted,
            author_name: "alice".into(),
            author_email: "alice@example.com".into(),
        }
    }

    fn analyze(events: &[ChangeEvent], sizes: &HashMap<String, u64>) -> HotspotReport {
        let window = AnalysisWindow::ending_at(now(), 90);
        analyze_hotspots(events, &window, sizes, &HotspotConfig::default())
    }

    #[test]
    fn frequency_and_churn_are_counted() {
        let events = vec![
            change("c1", 5, "a.py", 10, 5),
            change("c2", 2, "a.py", 20, 10),
        ];
        let report = analyze(&events, &HashMap::new());
        let a = report.get("a.py").unwrap();
        assert_eq!(a.change_frequency, 2);
        assert_eq!(a.code_churn, 45);
        assert_eq!(report.total_commits, 2);
    }

    #[test]
    fn scores_are_in_valid_range_and_top_is_one() {
        let events = vec![
            change("c1", 1, "hot.rs", 100, 50),
            change("c2", 2, "hot.rs", 80, 40),
            change("c3", 3, "hot.rs", 60, 30),
            change("c4", 60, "cold.rs", 5, 0),
        ];
        let report = analyze(&events, &HashMap::new());
        assert_eq!(report.files[0].file_path, "hot.rs");
        assert_eq!(report.files[0].hotspot_score, 1.0);
        for f in &report.files {
            assert!(
                (0.0..=1.0).contains(&f.hotspot_score),
                "score {} out of range for {}",
                f.hotspot_score,
                f.file_path
            );
        }
    }

    #[test]
    fn recent_changes_outweigh_old_ones() {
        let events = vec![
            change("c1", 1, "recent.rs", 10, 0),
            change("c2", 80, "old.rs", 10, 0),
        ];
        let report = analyze(&events, &HashMap::new());
        let recent = report.get("recent.rs").unwrap();
        let old = report.get("old.rs").unwrap();
        assert!(recent.weighted_frequency > old.weighted_frequency);
        assert!(recent.hotspot_score > old.hotspot_score);
    }

    #[test]
    fn known_size_makes_churn_relative() {
        let events = vec![
            change("c1", 1, "big.rs", 100, 0),
            change("c1", 1, "small.rs", 50, 0),
        ];
        let sizes = HashMap::from([("big.rs".to_string(), 10_000u64), ("small.rs".to_string(), 100)]);
        let report = analyze(&events, &sizes);
        assert_eq!(report.files[0].file_path, "small.rs");
        assert_eq!(report.get("big.rs").unwrap().file_size, Some(10_000));
    }

    #[test]
    fn single_commit_file_has_no_rework() {
        let events = vec![change("c1", 1, "solo.rs", 3, 1)];
        let report = analyze(&events, &HashMap::new());
        let solo = &report.files[0];
        assert_eq!(solo.rework_ratio, 0.0);
        assert_eq!(solo.hotspot_score, 1.0);
    }

    #[test]
    fn rework_counts_quick_follow_ups_over_commit_count() {
        let events = vec![
            change("c1", 50, "a.rs", 1, 0),
            change("c2", 45, "a.rs", 1, 0),
            change("c3", 40, "a.rs", 1, 0),
            change("c4", 5, "a.rs", 1, 0),
        ];
        let report = analyze(&events, &HashMap::new());
        // gaps: 5d, 5d, 35d -> 2 quick follow-ups over 4 commits
        assert!((report.files[0].rework_ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_events_give_empty_report() {
        let report = analyze(&[], &HashMap::new());
        assert!(report.files.is_empty());
        assert_eq!(report.total_commits, 0);
    }
}
