//! Relative effort index (REI) per file.
//!
//! The model is trained against a proxy label built from commit density
//! and rework, then every file is scored by the fitted linear model and
//! rescaled into `[0, 1]`. Per-feature attributions explain each score.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vitals_core::math::{median, min_max_normalize, round_f64};
use vitals_core::{ChangeEvent, EffortConfig};
use vitals_gitpulse::coupling::CouplingReport;
use vitals_gitpulse::hotspots::HotspotReport;
use vitals_gitpulse::knowledge::KnowledgeReport;

use crate::regression::{fit_best_alpha, predict, r_squared, ridge_fit};

/// Model inputs, in column order.
pub const FEATURE_NAMES: [&str; 6] = [
    "code_churn",
    "change_frequency",
    "pain_score",
    "knowledge_concentration",
    "author_count",
    "concentration_x_pain",
];

/// Below this many files the model is not trained.
const MIN_TRAINING_FILES: usize = 3;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCoefficient {
    pub feature: String,
    pub coefficient: f64,
}

/// One feature's share of a file's raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAttribution {
    pub feature: String,
    /// Unscaled feature value.
    pub value: f64,
    /// Min-max scaled value the model saw.
    pub scaled_value: f64,
    /// `coefficient × scaled_value`.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEffort {
    pub file_path: String,
    /// Min-max normalized model score in `[0, 1]`.
    pub rei_score: f64,
    /// Training label: blend of normalized density and rework.
    pub proxy_label: f64,
    /// Model score before normalization; the attributions sum to it.
    pub raw_score: f64,
    pub commit_density: f64,
    /// Sorted by `|contribution|` descending.
    pub attributions: Vec<FeatureAttribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffortReport {
    /// False when the equal-weight fallback was used.
    pub trained: bool,
    pub alpha: Option<f64>,
    pub r_squared: f64,
    pub coefficients: Vec<FeatureCoefficient>,
    /// Sorted by REI descending.
    pub files: Vec<FileEffort>,
}

/// `1 / (1 + median gap in days)` between a file's commits.
///
/// A file with one commit or none has density 1.0.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use vitals_insight::effort::commit_density;
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(commit_density(&[t0]), 1.0);
/// let dates = [t0, t0 + Duration::days(1), t0 + Duration::days(4), t0 + Duration::days(8)];
/// assert_eq!(commit_density(&dates), 0.25);
/// ```
pub fn commit_density(dates: &[DateTime<Utc>]) -> f64 {
    if dates.len() <= 1 {
        return 1.0;
    }
    let mut sorted = dates.to_vec();
    sorted.sort();
    let gaps: Vec<f64> = sorted
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / SECONDS_PER_DAY)
        .collect();
    1.0 / (1.0 + median(&gaps).unwrap_or(0.0))
}

/// Training label `0.5·minmax(density) + 0.5·minmax(rework)`.
pub fn effort_proxy(densities: &[f64], rework: &[f64]) -> Vec<f64> {
    let densities = min_max_normalize(densities);
    let rework = min_max_normalize(rework);
    densities
        .iter()
        .zip(&rework)
        .map(|(d, r)| 0.5 * d + 0.5 * r)
        .collect()
}

/// Score every file in `hotspots` for relative effort.
///
/// Pain and knowledge concentration come from `coupling` and `knowledge`;
/// files missing from those reports take 0.0.
pub fn analyze_effort(
    events: &[ChangeEvent],
    hotspots: &HotspotReport,
    knowledge: &KnowledgeReport,
    coupling: &CouplingReport,
    config: &EffortConfig,
) -> EffortReport {
    if hotspots.files.is_empty() {
        return EffortReport::default();
    }

    let dates = commit_dates_by_file(events);
    let paths: Vec<&str> = hotspots.files.iter().map(|f| f.file_path.as_str()).collect();

    let raw_rows: Vec<[f64; 6]> = hotspots
        .files
        .iter()
        .map(|file| {
            let pain = coupling
                .pain_for(&file.file_path)
                .map_or(0.0, |p| p.pain_score);
            let kdi = knowledge
                .get(&file.file_path)
                .map_or(0.0, |k| k.knowledge_concentration);
            [
                file.code_churn as f64,
                f64::from(file.change_frequency),
                pain,
                kdi,
                f64::from(file.authors),
                kdi * pain,
            ]
        })
        .collect();
    let scaled_rows = scale_columns(&raw_rows);

    let densities: Vec<f64> = paths
        .iter()
        .map(|p| commit_density(dates.get(p).map_or(&[][..], |d| d.as_slice())))
        .collect();
    let rework: Vec<f64> = hotspots.files.iter().map(|f| f.rework_ratio).collect();
    let proxy = effort_proxy(&densities, &rework);

    let (trained, alpha, r_squared, beta) = fit(&scaled_rows, &proxy, config);
    debug!(files = paths.len(), trained, r_squared, "effort model fitted");

    let raw_scores: Vec<f64> = scaled_rows
        .iter()
        .map(|row| row.iter().zip(&beta).map(|(v, b)| v * b).sum())
        .collect();
    let rei = min_max_normalize(&raw_scores);

    let mut files: Vec<FileEffort> = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let mut attributions: Vec<FeatureAttribution> = FEATURE_NAMES
                .iter()
                .enumerate()
                .map(|(j, name)| FeatureAttribution {
                    feature: (*name).to_string(),
                    value: raw_rows[i][j],
                    scaled_value: scaled_rows[i][j],
                    contribution: beta[j] * scaled_rows[i][j],
                })
                .collect();
            attributions.sort_by(|a, b| {
                b.contribution
                    .abs()
                    .total_cmp(&a.contribution.abs())
                    .then_with(|| a.feature.cmp(&b.feature))
            });
            FileEffort {
                file_path: (*path).to_string(),
                rei_score: round_f64(rei[i], 4),
                proxy_label: round_f64(proxy[i], 4),
                raw_score: raw_scores[i],
                commit_density: densities[i],
                attributions,
            }
        })
        .collect();

    files.sort_by(|a, b| {
        b.rei_score
            .total_cmp(&a.rei_score)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    EffortReport {
        trained,
        alpha,
        r_squared,
        coefficients: FEATURE_NAMES
            .iter()
            .zip(&beta)
            .map(|(name, c)| FeatureCoefficient {
                feature: (*name).to_string(),
                coefficient: *c,
            })
            .collect(),
        files,
    }
}

fn fit(
    rows: &[[f64; 6]],
    proxy: &[f64],
    config: &EffortConfig,
) -> (bool, Option<f64>, f64, Vec<f64>) {
    let equal = vec![1.0 / FEATURE_NAMES.len() as f64; FEATURE_NAMES.len()];
    if rows.len() < MIN_TRAINING_FILES {
        return (false, None, 0.0, equal);
    }

    let x: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
    let fitted = match config.alpha {
        Some(alpha) => ridge_fit(&x, proxy, alpha).map(|beta| {
            let r2 = r_squared(proxy, &predict(&x, &beta));
            (alpha, beta, r2)
        }),
        None => fit_best_alpha(&x, proxy, &config.alpha_grid)
            .map(|f| (f.alpha, f.coefficients, f.r_squared)),
    };

    match fitted {
        Some((alpha, beta, r2)) => (true, Some(alpha), r2, beta),
        None => {
            warn!("effort model could not be solved, using equal weights");
            (false, None, 0.0, equal)
        }
    }
}

fn scale_columns(rows: &[[f64; 6]]) -> Vec<[f64; 6]> {
    let mut scaled = vec![[0.0; 6]; rows.len()];
    for col in 0..6 {
        let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
        for (row, v) in scaled.iter_mut().zip(min_max_normalize(&column)) {
            row[col] = v;
        }
    }
    scaled
}

fn commit_dates_by_file(events: &[ChangeEvent]) -> BTreeMap<&str, Vec<DateTime<Utc>>> {
    let mut per_file: BTreeMap<&str, BTreeMap<&str, DateTime<Utc>>> = BTreeMap::new();
    for event in events {
        per_file
            .entry(event.file_path.as_str())
            .or_default()
            .entry(event.commit_hash.as_str())
            .and_modify(|ts| *ts = (*ts).min(event.timestamp))
            .or_insert(event.timestamp);
    }
    per_file
        .into_iter()
        .map(|(path, commits)| (path, commits.into_values().collect()))
        .collect()
}
