//! Temporal coupling and PAIN detection.
//!
//! Identifies pairs of files that change together more often than chance
//! would predict, and combines each file's size, volatility, and coupling
//! distance into a PAIN score.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vitals_core::math::{max_of, max_ratio, recency_weight, round_f64};
use vitals_core::{AnalysisWindow, ChangeEvent, CouplingConfig};

use crate::commits::group_by_commit;

/// A pair of files that change together more often than expected.
///
/// # Examples
///
/// ```
/// use vitals_gitpulse::coupling::CouplingPair;
///
/// let pair = CouplingPair {
///     file_a: "src/auth.rs".into(),
///     file_b: "src/session.rs".into(),
///     shared_commits: 15,
///     coupling_strength: 0.75,
///     support: 0.1,
///     expected_cochange: 4.0,
///     lift: 3.75,
/// };
/// assert!(pair.file_a < pair.file_b);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingPair {
    /// First file in the pair (lexicographically smaller).
    pub file_a: String,
    /// Second file in the pair.
    pub file_b: String,
    /// Raw number of commits touching both files.
    pub shared_commits: u32,
    /// Recency-weighted Jaccard index of the two files' commit sets.
    pub coupling_strength: f64,
    /// `shared_commits / total_commits`.
    pub support: f64,
    /// `count_a × count_b / total_commits`.
    pub expected_cochange: f64,
    /// `shared_commits / expected_cochange`.
    pub lift: f64,
}

/// PAIN components for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePain {
    pub file_path: String,
    /// Churn over the maximum churn.
    pub size_normalized: f64,
    /// Commit count over the maximum commit count.
    pub volatility_normalized: f64,
    /// Mean strength of retained pairs over the maximum such mean.
    pub distance_normalized: f64,
    /// Product of the three components, rounded to 4 decimals.
    pub pain_score: f64,
}

/// Coupling and PAIN report for one analysis window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingReport {
    /// Distinct commits in the input.
    pub total_commits: usize,
    /// Retained pairs, strongest first.
    pub coupling_pairs: Vec<CouplingPair>,
    /// Every file in the window, highest PAIN first.
    pub pain: Vec<FilePain>,
}

impl CouplingReport {
    pub fn pain_for(&self, file_path: &str) -> Option<&FilePain> {
        self.pain.iter().find(|p| p.file_path == file_path)
    }
}

#[derive(Default)]
struct FileStats {
    commits: u32,
    weighted_commits: f64,
    churn: u64,
}

#[derive(Default)]
struct PairStats {
    shared: u32,
    weighted_shared: f64,
}

/// Detect temporal coupling and compute PAIN for every file.
///
/// A pair is retained iff `shared_commits >= min_shared_commits` and
/// `lift > 1.0`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::{AnalysisWindow, ChangeEvent, CouplingConfig};
/// use vitals_gitpulse::coupling::analyze_coupling;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let change = |hash: &str, file: &str| ChangeEvent {
///     commit_hash: hash.into(),
///     timestamp: now,
///     file_path: file.into(),
///     lines_added: 5,
///     lines_deleted: 0,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// };
/// let events = vec![
///     change("c1", "a"), change("c1", "b"),
///     change("c2", "a"), change("c2", "b"),
///     change("c3", "c"),
/// ];
/// let window = AnalysisWindow::ending_at(now, 90);
/// let report = analyze_coupling(&events, &window, &CouplingConfig::default());
/// assert_eq!(report.coupling_pairs.len(), 1);
/// assert!((report.coupling_pairs[0].lift - 1.5).abs() < 1e-9);
/// ```
pub fn analyze_coupling(
    events: &[ChangeEvent],
    window: &AnalysisWindow,
    config: &CouplingConfig,
) -> CouplingReport {
    let commits = group_by_commit(events);
    let total_commits = commits.len();

    let mut files: BTreeMap<&str, FileStats> = BTreeMap::new();
    let mut pairs: BTreeMap<(&str, &str), PairStats> = BTreeMap::new();

    for event in events {
        files.entry(event.file_path.as_str()).or_default().churn += event.churn();
    }

    for commit in &commits {
        let weight = recency_weight(window.age_days(commit.timestamp), config.half_life_days);
        // BTreeSet iteration is sorted, so (i, j) with i < j is already normalized
        let touched: Vec<&str> = commit.files.iter().map(String::as_str).collect();

        for file in &touched {
            let stats = files.entry(*file).or_default();
            stats.commits += 1;
            stats.weighted_commits += weight;
        }

        for i in 0..touched.len() {
            for j in (i + 1)..touched.len() {
                let stats = pairs.entry((touched[i], touched[j])).or_default();
                stats.shared += 1;
                stats.weighted_shared += weight;
            }
        }
    }

    let mut coupling_pairs = Vec::new();
    for ((file_a, file_b), stats) in &pairs {
        if stats.shared < config.min_shared_commits {
            continue;
        }
        let (Some(a), Some(b)) = (files.get(file_a), files.get(file_b)) else {
            continue;
        };

        let expected_cochange =
            f64::from(a.commits) * f64::from(b.commits) / total_commits as f64;
        let lift = f64::from(stats.shared) / expected_cochange;
        if lift <= 1.0 {
            continue;
        }

        let union = a.weighted_commits + b.weighted_commits - stats.weighted_shared;
        let coupling_strength = if union > 0.0 {
            stats.weighted_shared / union
        } else {
            0.0
        };

        coupling_pairs.push(CouplingPair {
            file_a: (*file_a).to_string(),
            file_b: (*file_b).to_string(),
            shared_commits: stats.shared,
            coupling_strength,
            support: f64::from(stats.shared) / total_commits as f64,
            expected_cochange,
            lift,
        });
    }

    coupling_pairs.sort_by(|a, b| {
        b.coupling_strength
            .total_cmp(&a.coupling_strength)
            .then_with(|| a.file_a.cmp(&b.file_a))
            .then_with(|| a.file_b.cmp(&b.file_b))
    });

    let pain = compute_pain(&files, &coupling_pairs);

    debug!(
        commits = total_commits,
        candidate_pairs = pairs.len(),
        retained_pairs = coupling_pairs.len(),
        "coupling analysis complete"
    );

    CouplingReport {
        total_commits,
        coupling_pairs,
        pain,
    }
}

fn compute_pain(files: &BTreeMap<&str, FileStats>, pairs: &[CouplingPair]) -> Vec<FilePain> {
    let mut strengths: HashMap<&str, Vec<f64>> = HashMap::new();
    for pair in pairs {
        strengths
            .entry(pair.file_a.as_str())
            .or_default()
            .push(pair.coupling_strength);
        strengths
            .entry(pair.file_b.as_str())
            .or_default()
            .push(pair.coupling_strength);
    }

    let distance_raw: BTreeMap<&str, f64> = files
        .keys()
        .map(|path| {
            let mean = strengths
                .get(path)
                .map_or(0.0, |s| s.iter().sum::<f64>() / s.len() as f64);
            (*path, mean)
        })
        .collect();

    let max_churn = max_of(files.values().map(|f| f.churn as f64));
    let max_commits = max_of(files.values().map(|f| f64::from(f.commits)));
    let max_distance = max_of(distance_raw.values().copied());

    let mut pain: Vec<FilePain> = files
        .iter()
        .map(|(path, stats)| {
            let size_normalized = max_ratio(stats.churn as f64, max_churn);
            let volatility_normalized = max_ratio(f64::from(stats.commits), max_commits);
            let distance_normalized = max_ratio(distance_raw[path], max_distance);
            FilePain {
                file_path: (*path).to_string(),
                size_normalized,
                volatility_normalized,
                distance_normalized,
                pain_score: round_f64(
                    size_normalized * volatility_normalized * distance_normalized,
                    4,
                ),
            }
        })
        .collect();

    pain.sort_by(|a, b| {
        b.pain_score
            .total_cmp(&a.pain_score)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    pain
}
