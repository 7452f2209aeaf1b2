//! Commit featurization for clustering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitals_core::math::min_max_normalize;
use vitals_core::ChangeEvent;
use vitals_gitpulse::commits::group_by_commit;

/// One row per commit: the clustering unit.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use vitals_insight::features::CommitFeatures;
///
/// let row = CommitFeatures {
///     commit_hash: "c1".into(),
///     timestamp: Utc::now(),
///     file_count: 3,
///     total_churn: 120,
///     add_ratio: 0.9,
/// };
/// assert!(row.add_ratio > 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFeatures {
    pub commit_hash: String,
    pub timestamp: DateTime<Utc>,
    /// Distinct files touched.
    pub file_count: u32,
    /// Lines added + deleted.
    pub total_churn: u64,
    /// `added / (added + deleted)`, 0.0 for churn-free commits.
    pub add_ratio: f64,
}

/// Featurize every commit in `events`, ordered by timestamp then hash.
pub fn commit_features(events: &[ChangeEvent]) -> Vec<CommitFeatures> {
    group_by_commit(events)
        .into_iter()
        .map(|commit| {
            let churn = commit.churn();
            let add_ratio = if churn > 0 {
                commit.lines_added as f64 / churn as f64
            } else {
                0.0
            };
            CommitFeatures {
                file_count: commit.files.len() as u32,
                total_churn: churn,
                add_ratio,
                commit_hash: commit.hash,
                timestamp: commit.timestamp,
            }
        })
        .collect()
}

/// Min-max scale each dimension independently into `[file_count, churn, add_ratio]` points.
///
/// A constant dimension maps to 0.0.
pub fn normalize_features(rows: &[CommitFeatures]) -> Vec<Vec<f64>> {
    let file_counts: Vec<f64> = rows.iter().map(|r| f64::from(r.file_count)).collect();
    let churns: Vec<f64> = rows.iter().map(|r| r.total_churn as f64).collect();
    let add_ratios: Vec<f64> = rows.iter().map(|r| r.add_ratio).collect();

    let file_counts = min_max_normalize(&file_counts);
    let churns = min_max_normalize(&churns);
    let add_ratios = min_max_normalize(&add_ratios);

    (0..rows.len())
        .map(|i| vec![file_counts[i], churns[i], add_ratios[i]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn change(hash: &str, file: &str, added: u64, deleted: u64) -> ChangeEvent {
        ChangeEvent {
            commit_hash: hash.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            file_path: file.into(),
            lines_added: added,
            lines_deleted: deleted,
            author_name: "alice".into(),
            author_email: "alice@example.com".into(),
        }
    }

    #[test]
    fn commit_rows_aggregate_files() {
        let rows = commit_features(&[
            change("c1", "a.rs", 30, 10),
            change("c1", "b.rs", 10, 0),
            change("c2", "a.rs", 0, 0),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].file_count, 2);
        assert_eq!(rows[0].total_churn, 50);
        assert!((rows[0].add_ratio - 0.8).abs() < 1e-12);
        assert_eq!(rows[1].add_ratio, 0.0);
    }

    #[test]
    fn constant_dimension_normalizes_to_zero() {
        let rows = commit_features(&[change("c1", "a.rs", 10, 0), change("c2", "a.rs", 30, 0)]);
        let points = normalize_features(&rows);
        assert_eq!(points[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(points[1], vec![0.0, 1.0, 0.0]);
    }
}
