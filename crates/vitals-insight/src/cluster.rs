//! Work-type clustering of commits.
//!
//! Commits are featurized, normalized, clustered with seeded k-means++,
//! and each cluster is named by a heuristic on its normalized centroid.
//! Drift then compares each label's share of commits between the two
//! halves of the analysis window.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vitals_core::math::{mean, round_f64};
use vitals_core::{AnalysisWindow, ChangeEvent, ClusteringConfig};

use crate::features::{commit_features, normalize_features, CommitFeatures};
use crate::kmeans::{auto_k, kmeans, silhouette_score};

/// Heuristic work type of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterLabel {
    Feature,
    Bugfix,
    Refactoring,
    Config,
    Mixed,
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature => write!(f, "feature"),
            Self::Bugfix => write!(f, "bugfix"),
            Self::Refactoring => write!(f, "refactoring"),
            Self::Config => write!(f, "config"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// Name a cluster from its normalized `[file_count, churn, add_ratio]` centroid.
///
/// # Examples
///
/// ```
/// use vitals_insight::cluster::{label_centroid, ClusterLabel};
///
/// assert_eq!(label_centroid(&[0.4, 0.9, 0.8]), ClusterLabel::Feature);
/// assert_eq!(label_centroid(&[0.1, 0.1, 0.2]), ClusterLabel::Config);
/// assert_eq!(label_centroid(&[0.1, 0.1, 0.9]), ClusterLabel::Bugfix);
/// assert_eq!(label_centroid(&[0.7, 0.4, 0.45]), ClusterLabel::Refactoring);
/// assert_eq!(label_centroid(&[0.4, 0.4, 0.1]), ClusterLabel::Mixed);
/// ```
pub fn label_centroid(centroid: &[f64]) -> ClusterLabel {
    let file_count = centroid.first().copied().unwrap_or(0.0);
    let churn = centroid.get(1).copied().unwrap_or(0.0);
    let add_ratio = centroid.get(2).copied().unwrap_or(0.0);

    if add_ratio >= 0.6 && churn >= 0.5 {
        ClusterLabel::Feature
    } else if churn < 0.3 && file_count < 0.3 {
        if add_ratio < 0.6 {
            ClusterLabel::Config
        } else {
            ClusterLabel::Bugfix
        }
    } else if file_count >= 0.5 && (0.3..0.6).contains(&add_ratio) {
        ClusterLabel::Refactoring
    } else {
        ClusterLabel::Mixed
    }
}

/// Raw (unnormalized) feature means of a cluster's members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMeans {
    pub file_count: f64,
    pub total_churn: f64,
    pub add_ratio: f64,
}

/// One non-empty cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: usize,
    pub label: ClusterLabel,
    pub size: usize,
    /// Normalized `[file_count, churn, add_ratio]`.
    pub centroid: Vec<f64>,
    pub mean_features: FeatureMeans,
    /// Member commit hashes in timestamp order.
    pub commits: Vec<String>,
}

/// Direction of a label's share between window halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Growing,
    Shrinking,
}

/// Share of commits carrying a label in each half of the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDrift {
    pub label: ClusterLabel,
    pub first_half_pct: f64,
    pub second_half_pct: f64,
    /// `second_half_pct - first_half_pct`, in percentage points.
    pub drift: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub k: usize,
    pub silhouette: f64,
    pub clusters: Vec<Cluster>,
    /// Sorted by `|drift|` descending.
    pub drift: Vec<ClusterDrift>,
}

/// Cluster the commits in `events`.
///
/// With fewer than two commits no search happens: each commit becomes its
/// own cluster and the silhouette is 0.0.
pub fn analyze_clusters(
    events: &[ChangeEvent],
    window: &AnalysisWindow,
    config: &ClusteringConfig,
) -> ClusterReport {
    let rows = commit_features(events);
    if rows.is_empty() {
        return ClusterReport::default();
    }

    let points = normalize_features(&rows);
    let k = if rows.len() < 2 {
        rows.len()
    } else {
        config
            .k
            .unwrap_or_else(|| {
                auto_k(
                    &points,
                    config.k_min,
                    config.k_max,
                    config.seed,
                    config.max_iterations,
                )
            })
            .max(1)
    };

    let result = kmeans(&points, k, config.seed, config.max_iterations);
    let silhouette = silhouette_score(&points, &result.assignments);
    debug!(
        commits = rows.len(),
        k,
        iterations = result.iterations,
        silhouette,
        "clustered commits"
    );

    let clusters: Vec<Cluster> = result
        .centroids
        .iter()
        .enumerate()
        .filter_map(|(id, centroid)| {
            let members: Vec<&CommitFeatures> = rows
                .iter()
                .zip(&result.assignments)
                .filter(|(_, a)| **a == id)
                .map(|(row, _)| row)
                .collect();
            if members.is_empty() {
                return None;
            }
            let column = |f: fn(&CommitFeatures) -> f64| -> f64 {
                mean(&members.iter().map(|m| f(m)).collect::<Vec<_>>())
            };
            Some(Cluster {
                id,
                label: label_centroid(centroid),
                size: members.len(),
                centroid: centroid.iter().map(|v| round_f64(*v, 4)).collect(),
                mean_features: FeatureMeans {
                    file_count: column(|m| f64::from(m.file_count)),
                    total_churn: column(|m| m.total_churn as f64),
                    add_ratio: column(|m| m.add_ratio),
                },
                commits: members.iter().map(|m| m.commit_hash.clone()).collect(),
            })
        })
        .collect();

    let labels: Vec<ClusterLabel> = result
        .assignments
        .iter()
        .map(|a| label_centroid(&result.centroids[*a]))
        .collect();
    let timestamps: Vec<DateTime<Utc>> = rows.iter().map(|r| r.timestamp).collect();
    let drift = label_drift(&timestamps, &labels, window.midpoint());

    ClusterReport {
        k,
        silhouette,
        clusters,
        drift,
    }
}

/// Per-label share drift between commits before and at-or-after `midpoint`.
///
/// `timestamps` and `labels` are parallel slices, one entry per commit.
pub fn label_drift(
    timestamps: &[DateTime<Utc>],
    labels: &[ClusterLabel],
    midpoint: DateTime<Utc>,
) -> Vec<ClusterDrift> {
    let mut first: BTreeMap<ClusterLabel, usize> = BTreeMap::new();
    let mut second: BTreeMap<ClusterLabel, usize> = BTreeMap::new();
    for (ts, label) in timestamps.iter().zip(labels) {
        let half = if *ts < midpoint {
            &mut first
        } else {
            &mut second
        };
        *half.entry(*label).or_default() += 1;
        // keep every seen label present in both halves
        first.entry(*label).or_default();
        second.entry(*label).or_default();
    }

    let first_total: usize = first.values().sum();
    let second_total: usize = second.values().sum();
    let pct = |count: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        }
    };

    let mut drift: Vec<ClusterDrift> = first
        .iter()
        .map(|(label, count)| {
            let first_half_pct = pct(*count, first_total);
            let second_half_pct = pct(second.get(label).copied().unwrap_or(0), second_total);
            let delta = second_half_pct - first_half_pct;
            let trend = if delta.abs() < 5.0 {
                Trend::Stable
            } else if delta > 0.0 {
                Trend::Growing
            } else {
                Trend::Shrinking
            };
            ClusterDrift {
                label: *label,
                first_half_pct: round_f64(first_half_pct, 2),
                second_half_pct: round_f64(second_half_pct, 2),
                drift: round_f64(delta, 2),
                trend,
            }
        })
        .collect();

    drift.sort_by(|a, b| {
        b.drift
            .abs()
            .total_cmp(&a.drift.abs())
            .then_with(|| a.label.cmp(&b.label))
    });
    drift
}
