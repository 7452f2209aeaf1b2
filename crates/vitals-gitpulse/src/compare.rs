//! Snapshot-to-snapshot hotspot comparison.
//!
//! Resolves two references to points in time, runs the hotspot engine
//! anchored at each, and diffs the two reports file by file.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vitals_core::{AnalysisWindow, VitalsConfig, VitalsError};

use crate::hotspots::{analyze_hotspots, FileMetric, HotspotReport};
use crate::source::{resolve_reference, ChangeSource};

/// How a file's hotspot score moved between the two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaStatus {
    /// Only present at the "to" end.
    New,
    /// Only present at the "from" end.
    Removed,
    /// Present at both ends with an identical score.
    Unchanged,
    /// Score went up.
    Degraded,
    /// Score went down.
    Improved,
}

/// Per-file difference between two hotspot snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDelta {
    pub file_path: String,
    pub status: DeltaStatus,
    pub from_score: Option<f64>,
    pub to_score: Option<f64>,
    /// `to_score - from_score`, a missing side counting as 0.
    pub score_delta: f64,
    pub churn_delta: i64,
    pub frequency_delta: i64,
}

/// Number of files per [`DeltaStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub degraded: usize,
    pub improved: usize,
}

/// Result of comparing hotspots at two references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub from_ref: String,
    pub to_ref: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub from_total_commits: usize,
    pub to_total_commits: usize,
    pub summary: StatusCounts,
    /// Sorted by `|score_delta|` descending.
    pub files: Vec<FileDelta>,
}

/// Compare hotspots at `from_ref` and `to_ref`.
///
/// Each side is analyzed over a window of `config.window.days` ending at
/// the resolved date, with file sizes as of that reference.
///
/// # Errors
///
/// Returns [`VitalsError::UnresolvableRef`] when a reference is neither
/// an ISO date nor known to `source`, and propagates source failures.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::{ChangeEvent, VitalsConfig};
/// use vitals_gitpulse::compare::{compare_hotspots, DeltaStatus};
/// use vitals_gitpulse::source::MemorySource;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
/// let source = MemorySource::new(vec![ChangeEvent {
///     commit_hash: "c1".into(),
///     timestamp: at,
///     file_path: "a.rs".into(),
///     lines_added: 3,
///     lines_deleted: 1,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// }]);
///
/// let report = compare_hotspots(&source, "2024-05-01", "2024-06-01", &VitalsConfig::default()).unwrap();
/// assert_eq!(report.files[0].status, DeltaStatus::New);
/// assert_eq!(report.summary.new, 1);
/// ```
pub fn compare_hotspots<S: ChangeSource + ?Sized>(
    source: &S,
    from_ref: &str,
    to_ref: &str,
    config: &VitalsConfig,
) -> Result<ComparisonReport, VitalsError> {
    let from_date = resolve_reference(source, from_ref)?;
    let to_date = resolve_reference(source, to_ref)?;
    info!(%from_date, %to_date, "comparing hotspot snapshots");

    let from = snapshot(source, from_ref, from_date, config)?;
    let to = snapshot(source, to_ref, to_date, config)?;

    let files = diff_hotspots(&from, &to);
    let summary = count_statuses(&files);

    Ok(ComparisonReport {
        from_ref: from_ref.to_string(),
        to_ref: to_ref.to_string(),
        from_date,
        to_date,
        from_total_commits: from.total_commits,
        to_total_commits: to.total_commits,
        summary,
        files,
    })
}

fn snapshot<S: ChangeSource + ?Sized>(
    source: &S,
    reference: &str,
    at: DateTime<Utc>,
    config: &VitalsConfig,
) -> Result<HotspotReport, VitalsError> {
    let window = AnalysisWindow::ending_at(at, config.window.days);
    let events = window.scope(&source.changes(window.from, window.to)?);
    let sizes = source.file_sizes(reference)?;
    debug!(reference, events = events.len(), "snapshot events loaded");
    Ok(analyze_hotspots(&events, &window, &sizes, &config.hotspot))
}

/// Diff two hotspot reports over the union of their files.
pub fn diff_hotspots(from: &HotspotReport, to: &HotspotReport) -> Vec<FileDelta> {
    let paths: BTreeSet<&str> = from
        .files
        .iter()
        .chain(&to.files)
        .map(|f| f.file_path.as_str())
        .collect();

    let mut deltas: Vec<FileDelta> = paths
        .into_iter()
        .map(|path| {
            let before = from.get(path);
            let after = to.get(path);
            let from_score = before.map(|f| f.hotspot_score);
            let to_score = after.map(|f| f.hotspot_score);
            let score_delta = to_score.unwrap_or(0.0) - from_score.unwrap_or(0.0);

            let status = match (before, after) {
                (None, _) => DeltaStatus::New,
                (_, None) => DeltaStatus::Removed,
                _ if score_delta > 0.0 => DeltaStatus::Degraded,
                _ if score_delta < 0.0 => DeltaStatus::Improved,
                _ => DeltaStatus::Unchanged,
            };

            let churn = |m: Option<&FileMetric>| m.map_or(0, |f| f.code_churn as i64);
            let freq = |m: Option<&FileMetric>| m.map_or(0, |f| i64::from(f.change_frequency));

            FileDelta {
                file_path: path.to_string(),
                status,
                from_score,
                to_score,
                score_delta,
                churn_delta: churn(after) - churn(before),
                frequency_delta: freq(after) - freq(before),
            }
        })
        .collect();

    deltas.sort_by(|a, b| {
        b.score_delta
            .abs()
            .total_cmp(&a.score_delta.abs())
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    deltas
}

fn count_statuses(files: &[FileDelta]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for file in files {
        match file.status {
            DeltaStatus::New => counts.new += 1,
            DeltaStatus::Removed => counts.removed += 1,
            DeltaStatus::Unchanged => counts.unchanged += 1,
            DeltaStatus::Degraded => counts.degraded += 1,
            DeltaStatus::Improved => counts.improved += 1,
        }
    }
    counts
}
