//! One-shot analysis of a window: every engine, in dependency order.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use vitals_core::{AnalysisWindow, ChangeEvent, VitalsConfig, VitalsError};
use vitals_gitpulse::coupling::{analyze_coupling, CouplingReport};
use vitals_gitpulse::hotspots::{analyze_hotspots, HotspotReport};
use vitals_gitpulse::knowledge::{analyze_knowledge, KnowledgeReport};

use crate::cluster::{analyze_clusters, ClusterReport};
use crate::dx::{analyze_dx, DxReport};
use crate::effort::{analyze_effort, EffortReport};

/// Everything Vitals knows about one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub window: AnalysisWindow,
    pub total_commits: usize,
    pub total_files: usize,
    pub hotspots: HotspotReport,
    pub knowledge: KnowledgeReport,
    pub coupling: CouplingReport,
    pub clusters: ClusterReport,
    pub effort: EffortReport,
    pub dx: DxReport,
}

/// Run hotspot, knowledge, coupling, clustering, effort, and DX analysis
/// over the events inside `window`.
///
/// Events outside the window are ignored. An empty window produces
/// zero-valued reports rather than an error.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use chrono::{TimeZone, Utc};
/// use vitals_core::{AnalysisWindow, VitalsConfig};
/// use vitals_insight::pipeline::analyze_window;
///
/// let window = AnalysisWindow::ending_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 90);
/// let report = analyze_window(&[], &window, &HashMap::new(), &HashMap::new(), &VitalsConfig::default());
/// assert_eq!(report.total_commits, 0);
/// assert!(report.hotspots.files.is_empty());
/// assert_eq!(report.dx.focus_ratio, 0.5);
/// assert_eq!(report.dx.dx_score, 0.0);
/// ```
pub fn analyze_window(
    events: &[ChangeEvent],
    window: &AnalysisWindow,
    file_sizes: &HashMap<String, u64>,
    complexity: &HashMap<String, f64>,
    config: &VitalsConfig,
) -> HealthReport {
    let events = window.scope(events);
    let total_commits = events
        .iter()
        .map(|e| e.commit_hash.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let total_files = events
        .iter()
        .map(|e| e.file_path.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    info!(
        from = %window.from,
        to = %window.to,
        commits = total_commits,
        files = total_files,
        "analyzing window"
    );

    let hotspots = analyze_hotspots(&events, window, file_sizes, &config.hotspot);
    let knowledge = analyze_knowledge(&events, window, &config.knowledge);
    let coupling = analyze_coupling(&events, window, &config.coupling);
    let clusters = analyze_clusters(&events, window, &config.clustering);
    let effort = analyze_effort(&events, &hotspots, &knowledge, &coupling, &config.effort);
    let dx = analyze_dx(
        window,
        &hotspots,
        &knowledge,
        &coupling,
        &clusters,
        &effort,
        complexity,
        &config.dx,
    );

    HealthReport {
        window: *window,
        total_commits,
        total_files,
        hotspots,
        knowledge,
        coupling,
        clusters,
        effort,
        dx,
    }
}

/// Load per-file average complexity from a JSON object of `path: number`.
///
/// # Errors
///
/// Returns [`VitalsError::FileNotFound`] when `path` does not exist and
/// [`VitalsError::Serialization`] when it is not such an object.
pub fn load_complexity(path: &Path) -> Result<HashMap<String, f64>, VitalsError> {
    if !path.exists() {
        return Err(VitalsError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn change(hash: &str, ts: DateTime<Utc>, file: &str, churn: u64) -> ChangeEvent {
        ChangeEvent {
            commit_hash: hash.into(),
            timestamp: ts,
            file_path: file.into(),
            lines_added: churn,
            lines_deleted: 1,
            author_name: "alice".into(),
            author_email: "alice@example.com".into(),
        }
    }

    #[test]
    fn events_outside_window_are_dropped() {
        let window = AnalysisWindow::ending_at(day(30), 10);
        let events = vec![
            change("old", day(5), "old.rs", 10),
            change("c1", day(25), "a.rs", 10),
            change("c1", day(25), "b.rs", 3),
        ];
        let report = analyze_window(
            &events,
            &window,
            &HashMap::new(),
            &HashMap::new(),
            &VitalsConfig::default(),
        );
        assert_eq!(report.total_commits, 1);
        assert_eq!(report.total_files, 2);
        assert!(report.hotspots.get("old.rs").is_none());
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let window = AnalysisWindow::ending_at(day(40), 40);
        let events: Vec<ChangeEvent> = (0..12)
            .map(|i| {
                change(
                    &format!("c{i}"),
                    day(i * 3),
                    if i % 3 == 0 { "a.rs" } else { "b.rs" },
                    (i as u64 + 1) * 7,
                )
            })
            .collect();
        let run = || {
            analyze_window(
                &events,
                &window,
                &HashMap::new(),
                &HashMap::new(),
                &VitalsConfig::default(),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn complexity_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("complexity.json");
        std::fs::write(&path, r#"{"src/a.rs": 4.5, "src/b.rs": 1}"#).unwrap();
        let map = load_complexity(&path).unwrap();
        assert_eq!(map.get("src/a.rs"), Some(&4.5));
        assert_eq!(map.get("src/b.rs"), Some(&1.0));

        let missing = load_complexity(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, VitalsError::FileNotFound(_)));
    }
}
