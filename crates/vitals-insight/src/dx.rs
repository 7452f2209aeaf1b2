//! Developer-experience composite score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vitals_core::math::{mean, min_max_normalize, round_f64};
use vitals_core::{AnalysisWindow, DxConfig, DxWeights, LabelWeights};
use vitals_gitpulse::coupling::CouplingReport;
use vitals_gitpulse::hotspots::HotspotReport;
use vitals_gitpulse::knowledge::KnowledgeReport;

use crate::cluster::{ClusterLabel, ClusterReport};
use crate::effort::EffortReport;

/// Cognitive-load breakdown for one file; every signal is min-max scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCognitiveLoad {
    pub file_path: String,
    pub complexity: f64,
    pub coupling_distance: f64,
    pub knowledge_concentration: f64,
    pub change_frequency: f64,
    /// Mean of the four signals.
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DxReport {
    pub throughput: f64,
    pub feedback_delay: f64,
    pub focus_ratio: f64,
    pub cognitive_load: f64,
    /// Weighted composite in `[0, 1]`.
    pub dx_score: f64,
    pub weights: DxWeights,
    /// Sorted by load descending.
    pub files: Vec<FileCognitiveLoad>,
}

/// Weight of a cluster label in the throughput sum.
pub fn label_weight(label: ClusterLabel, weights: &LabelWeights) -> f64 {
    match label {
        ClusterLabel::Feature => weights.feature,
        ClusterLabel::Refactoring => weights.refactoring,
        ClusterLabel::Bugfix => weights.bugfix,
        ClusterLabel::Mixed => weights.mixed,
        ClusterLabel::Config => weights.config,
    }
}

/// Label-weighted commits per day against `max_daily_rate`, clamped to `[0, 1]`.
pub fn throughput(clusters: &ClusterReport, window_days: u32, config: &DxConfig) -> f64 {
    let capacity = f64::from(window_days) * config.max_daily_rate;
    if capacity <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = clusters
        .clusters
        .iter()
        .map(|c| c.size as f64 * label_weight(c.label, &config.label_weights))
        .sum();
    (weighted / capacity).clamp(0.0, 1.0)
}

/// Share of feature commits among labelled work, ignoring `mixed`.
///
/// Returns 0.5 when there is nothing to compare.
///
/// # Examples
///
/// ```
/// use vitals_insight::cluster::ClusterReport;
/// use vitals_insight::dx::focus_ratio;
///
/// assert_eq!(focus_ratio(&ClusterReport::default()), 0.5);
/// ```
pub fn focus_ratio(clusters: &ClusterReport) -> f64 {
    let count = |label: ClusterLabel| -> usize {
        clusters
            .clusters
            .iter()
            .filter(|c| c.label == label)
            .map(|c| c.size)
            .sum()
    };
    let feature = count(ClusterLabel::Feature);
    let denominator = feature
        + count(ClusterLabel::Bugfix)
        + count(ClusterLabel::Refactoring)
        + count(ClusterLabel::Config);
    if denominator == 0 {
        0.5
    } else {
        feature as f64 / denominator as f64
    }
}

/// `mean(commit density) × (1 - mean(rework ratio))`.
pub fn feedback_delay(effort: &EffortReport, hotspots: &HotspotReport) -> f64 {
    let densities: Vec<f64> = effort.files.iter().map(|f| f.commit_density).collect();
    let rework: Vec<f64> = hotspots.files.iter().map(|f| f.rework_ratio).collect();
    mean(&densities) * (1.0 - mean(&rework))
}

/// Per-file cognitive load over every file in `hotspots`.
///
/// Each signal is min-max scaled over the files that have it; a file
/// missing a signal takes 0.0 for that dimension.
pub fn cognitive_load(
    hotspots: &HotspotReport,
    knowledge: &KnowledgeReport,
    coupling: &CouplingReport,
    complexity: &HashMap<String, f64>,
) -> Vec<FileCognitiveLoad> {
    let paths: Vec<&str> = hotspots.files.iter().map(|f| f.file_path.as_str()).collect();

    let complexity = scale_present(paths.iter().map(|p| complexity.get(*p).copied()));
    let distance = scale_present(
        paths
            .iter()
            .map(|p| coupling.pain_for(p).map(|pain| pain.distance_normalized)),
    );
    let kdi = scale_present(
        paths
            .iter()
            .map(|p| knowledge.get(p).map(|k| k.knowledge_concentration)),
    );
    let frequency = scale_present(
        hotspots
            .files
            .iter()
            .map(|f| Some(f64::from(f.change_frequency))),
    );

    let mut files: Vec<FileCognitiveLoad> = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let signals = [complexity[i], distance[i], kdi[i], frequency[i]];
            FileCognitiveLoad {
                file_path: (*path).to_string(),
                complexity: complexity[i],
                coupling_distance: distance[i],
                knowledge_concentration: kdi[i],
                change_frequency: frequency[i],
                load: round_f64(mean(&signals), 4),
            }
        })
        .collect();

    files.sort_by(|a, b| {
        b.load
            .total_cmp(&a.load)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    files
}

/// Min-max scale the present values; absent entries become 0.0.
fn scale_present(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    let values: Vec<Option<f64>> = values.collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let mut scaled = min_max_normalize(&present).into_iter();
    values
        .iter()
        .map(|v| match v {
            Some(_) => scaled.next().unwrap_or(0.0),
            None => 0.0,
        })
        .collect()
}

/// Fold every engine's output into the DX composite.
#[allow(clippy::too_many_arguments)]
pub fn analyze_dx(
    window: &AnalysisWindow,
    hotspots: &HotspotReport,
    knowledge: &KnowledgeReport,
    coupling: &CouplingReport,
    clusters: &ClusterReport,
    effort: &EffortReport,
    complexity: &HashMap<String, f64>,
    config: &DxConfig,
) -> DxReport {
    let throughput = throughput(clusters, window.window_days, config);
    let feedback_delay = feedback_delay(effort, hotspots);
    let focus_ratio = focus_ratio(clusters);
    let files = cognitive_load(hotspots, knowledge, coupling, complexity);
    let load = mean(&files.iter().map(|f| f.load).collect::<Vec<_>>());

    let w = &config.weights;
    // A window with no touched files has no signal to score.
    let dx_score = if files.is_empty() {
        0.0
    } else {
        (w.throughput * throughput
            + w.feedback_delay * feedback_delay
            + w.focus * focus_ratio
            + w.cognitive_load * (1.0 - load))
            .clamp(0.0, 1.0)
    };

    DxReport {
        throughput: round_f64(throughput, 4),
        feedback_delay: round_f64(feedback_delay, 4),
        focus_ratio: round_f64(focus_ratio, 4),
        cognitive_load: round_f64(load, 4),
        dx_score: round_f64(dx_score, 4),
        weights: *w,
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Cluster, FeatureMeans};

    fn cluster(id: usize, label: ClusterLabel, size: usize) -> Cluster {
        Cluster {
            id,
            label,
            size,
            centroid: vec![0.0; 3],
            mean_features: FeatureMeans {
                file_count: 1.0,
                total_churn: 1.0,
                add_ratio: 1.0,
            },
            commits: Vec::new(),
        }
    }

    fn report(clusters: Vec<Cluster>) -> ClusterReport {
        ClusterReport {
            k: clusters.len(),
            silhouette: 0.0,
            clusters,
            drift: Vec::new(),
        }
    }

    #[test]
    fn throughput_weights_labels() {
        let clusters = report(vec![
            cluster(0, ClusterLabel::Feature, 10),
            cluster(1, ClusterLabel::Config, 10),
        ]);
        // (10 * 1.0 + 10 * 0.3) / (10 days * 10 per day)
        let t = throughput(&clusters, 10, &DxConfig::default());
        assert!((t - 0.13).abs() < 1e-12);
    }

    #[test]
    fn throughput_clamps_and_handles_zero_window() {
        let clusters = report(vec![cluster(0, ClusterLabel::Feature, 1000)]);
        assert_eq!(throughput(&clusters, 1, &DxConfig::default()), 1.0);
        assert_eq!(throughput(&clusters, 0, &DxConfig::default()), 0.0);
    }

    #[test]
    fn focus_ignores_mixed() {
        let clusters = report(vec![
            cluster(0, ClusterLabel::Feature, 3),
            cluster(1, ClusterLabel::Bugfix, 1),
            cluster(2, ClusterLabel::Mixed, 50),
        ]);
        assert_eq!(focus_ratio(&clusters), 0.75);

        let only_mixed = report(vec![cluster(0, ClusterLabel::Mixed, 5)]);
        assert_eq!(focus_ratio(&only_mixed), 0.5);
    }

    #[test]
    fn missing_signals_count_as_zero() {
        let scaled = scale_present(vec![Some(2.0), None, Some(4.0), Some(3.0)].into_iter());
        assert_eq!(scaled, vec![0.0, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn empty_window_scores_zero() {
        let window = AnalysisWindow::ending_at(chrono::Utc::now(), 30);
        let dx = analyze_dx(
            &window,
            &HotspotReport {
                window,
                total_commits: 0,
                files: Vec::new(),
            },
            &KnowledgeReport::default(),
            &CouplingReport::default(),
            &ClusterReport::default(),
            &EffortReport::default(),
            &HashMap::new(),
            &DxConfig::default(),
        );
        assert_eq!(dx.focus_ratio, 0.5);
        assert_eq!(dx.throughput, 0.0);
        assert_eq!(dx.cognitive_load, 0.0);
        assert_eq!(dx.dx_score, 0.0);
    }
}
