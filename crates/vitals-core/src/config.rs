use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

/// Top-level configuration loaded from `.vitals.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
/// Every section is optional; omitted keys fall back to their defaults.
///
/// # Examples
///
/// ```
/// use vitals_core::VitalsConfig;
///
/// let config = VitalsConfig::default();
/// assert_eq!(config.window.days, 90);
/// assert_eq!(config.hotspot.half_life_days, 30.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// Analysis window settings.
    #[serde(default)]
    pub window: WindowConfig,
    /// History mining settings for the git2 change source.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Hotspot & rework engine settings.
    #[serde(default)]
    pub hotspot: HotspotConfig,
    /// Knowledge engine settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// Coupling & PAIN engine settings.
    #[serde(default)]
    pub coupling: CouplingConfig,
    /// Change clustering settings.
    #[serde(default)]
    pub clustering: ClusteringConfig,
    /// Effort model settings.
    #[serde(default)]
    pub effort: EffortConfig,
    /// DX composite settings.
    #[serde(default)]
    pub dx: DxConfig,
}

impl VitalsConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Io`] if the file cannot be read, or
    /// [`VitalsError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vitals_core::VitalsConfig;
    /// use std::path::Path;
    ///
    /// let config = VitalsConfig::from_file(Path::new(".vitals.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, VitalsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitals_core::VitalsConfig;
    ///
    /// let toml = r#"
    /// [hotspot]
    /// rework_window_days = 7
    /// "#;
    /// let config = VitalsConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.hotspot.rework_window_days, 7);
    /// assert_eq!(config.hotspot.half_life_days, 30.0);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VitalsError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Analysis window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window length in days, ending at the anchor point (default: 90).
    #[serde(default = "default_window_days")]
    pub days: u32,
}

fn default_window_days() -> u32 {
    90
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
        }
    }
}

/// Options for git history mining.
///
/// # Examples
///
/// ```
/// use vitals_core::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert_eq!(config.max_files_per_commit, 25);
/// assert!(config.branch.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Skip commits touching more files than this (default: 25).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
}

fn default_max_files_per_commit() -> usize {
    25
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_files_per_commit: default_max_files_per_commit(),
            branch: None,
        }
    }
}

/// Hotspot & rework engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotConfig {
    /// Recency half-life in days (default: 30.0).
    #[serde(default = "default_hotspot_half_life")]
    pub half_life_days: f64,
    /// Maximum gap between consecutive commits that counts as rework (default: 14).
    #[serde(default = "default_rework_window_days")]
    pub rework_window_days: u32,
}

fn default_hotspot_half_life() -> f64 {
    30.0
}

fn default_rework_window_days() -> u32 {
    14
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_hotspot_half_life(),
            rework_window_days: default_rework_window_days(),
        }
    }
}

/// Knowledge engine configuration.
///
/// # Examples
///
/// ```
/// use vitals_core::KnowledgeConfig;
///
/// let config = KnowledgeConfig::default();
/// assert_eq!(config.half_life_days, 90.0);
/// assert_eq!(config.island_threshold, 0.8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Recency half-life in days (default: 90.0).
    #[serde(default = "default_long_half_life")]
    pub half_life_days: f64,
    /// Primary-author share above which a file is a knowledge island (default: 0.8).
    #[serde(default = "default_island_threshold")]
    pub island_threshold: f64,
}

fn default_long_half_life() -> f64 {
    90.0
}

fn default_island_threshold() -> f64 {
    0.8
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_long_half_life(),
            island_threshold: default_island_threshold(),
        }
    }
}

/// Coupling & PAIN engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Recency half-life in days (default: 90.0).
    #[serde(default = "default_long_half_life")]
    pub half_life_days: f64,
    /// Minimum raw shared commits for a pair to be reported (default: 2).
    #[serde(default = "default_min_shared_commits")]
    pub min_shared_commits: u32,
}

fn default_min_shared_commits() -> u32 {
    2
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_long_half_life(),
            min_shared_commits: default_min_shared_commits(),
        }
    }
}

/// Change clustering configuration.
///
/// # Examples
///
/// ```
/// use vitals_core::ClusteringConfig;
///
/// let config = ClusteringConfig::default();
/// assert_eq!(config.seed, 42);
/// assert_eq!((config.k_min, config.k_max), (2, 8));
/// assert!(config.k.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Seed for k-means++ initialization (default: 42).
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fixed cluster count; auto-selected by silhouette when absent.
    pub k: Option<usize>,
    /// Lower bound of the auto-k search (default: 2).
    #[serde(default = "default_k_min")]
    pub k_min: usize,
    /// Upper bound of the auto-k search (default: 8).
    #[serde(default = "default_k_max")]
    pub k_max: usize,
    /// Lloyd iteration cap (default: 100).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_seed() -> u64 {
    42
}

fn default_k_min() -> usize {
    2
}

fn default_k_max() -> usize {
    8
}

fn default_max_iterations() -> usize {
    100
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            k: None,
            k_min: default_k_min(),
            k_max: default_k_max(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Effort model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortConfig {
    /// Ridge penalty; auto-tuned over `alpha_grid` when absent.
    pub alpha: Option<f64>,
    /// Candidate penalties for auto-tuning.
    #[serde(default = "default_alpha_grid")]
    pub alpha_grid: Vec<f64>,
}

fn default_alpha_grid() -> Vec<f64> {
    vec![0.1, 0.5, 1.0, 2.0, 5.0]
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            alpha: None,
            alpha_grid: default_alpha_grid(),
        }
    }
}

/// DX composite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DxConfig {
    /// Commits per day considered full throughput.
    #[serde(default = "default_max_daily_rate")]
    pub max_daily_rate: f64,
    /// Weights of the four DX components.
    #[serde(default)]
    pub weights: DxWeights,
    /// Per-label throughput weights.
    #[serde(default)]
    pub label_weights: LabelWeights,
}

fn default_max_daily_rate() -> f64 {
    10.0
}

impl Default for DxConfig {
    fn default() -> Self {
        Self {
            max_daily_rate: default_max_daily_rate(),
            weights: DxWeights::default(),
            label_weights: LabelWeights::default(),
        }
    }
}

/// Weights of the DX composite; the defaults sum to 1.
///
/// # Examples
///
/// ```
/// use vitals_core::DxWeights;
///
/// let w = DxWeights::default();
/// let sum = w.throughput + w.feedback_delay + w.focus + w.cognitive_load;
/// assert!((sum - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DxWeights {
    #[serde(default = "default_quarter")]
    pub throughput: f64,
    #[serde(default = "default_quarter")]
    pub feedback_delay: f64,
    #[serde(default = "default_quarter")]
    pub focus: f64,
    /// Applied to the inverted load (`1 - load`).
    #[serde(default = "default_quarter")]
    pub cognitive_load: f64,
}

fn default_quarter() -> f64 {
    0.25
}

impl Default for DxWeights {
    fn default() -> Self {
        Self {
            throughput: default_quarter(),
            feedback_delay: default_quarter(),
            focus: default_quarter(),
            cognitive_load: default_quarter(),
        }
    }
}

/// Throughput weight per work-type label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelWeights {
    #[serde(default = "default_feature_weight")]
    pub feature: f64,
    #[serde(default = "default_refactoring_weight")]
    pub refactoring: f64,
    #[serde(default = "default_half")]
    pub bugfix: f64,
    #[serde(default = "default_half")]
    pub mixed: f64,
    #[serde(default = "default_config_weight")]
    pub config: f64,
}

fn default_feature_weight() -> f64 {
    1.0
}

fn default_refactoring_weight() -> f64 {
    0.8
}

fn default_half() -> f64 {
    0.5
}

fn default_config_weight() -> f64 {
    0.3
}

impl Default for LabelWeights {
    fn default() -> Self {
        Self {
            feature: default_feature_weight(),
            refactoring: default_refactoring_weight(),
            bugfix: default_half(),
            mixed: default_half(),
            config: default_config_weight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VitalsConfig::default();
        assert_eq!(config.window.days, 90);
        assert_eq!(config.history.max_files_per_commit, 25);
        assert_eq!(config.hotspot.half_life_days, 30.0);
        assert_eq!(config.hotspot.rework_window_days, 14);
        assert_eq!(config.knowledge.half_life_days, 90.0);
        assert_eq!(config.knowledge.island_threshold, 0.8);
        assert_eq!(config.coupling.half_life_days, 90.0);
        assert_eq!(config.coupling.min_shared_commits, 2);
        assert_eq!(config.clustering.max_iterations, 100);
        assert!(config.effort.alpha.is_none());
        assert_eq!(config.effort.alpha_grid, vec![0.1, 0.5, 1.0, 2.0, 5.0]);
        assert_eq!(config.dx.label_weights.feature, 1.0);
        assert_eq!(config.dx.label_weights.config, 0.3);
    }

    #[test]
    fn dx_section_defaults_rate_when_omitted() {
        let config = VitalsConfig::from_toml("[dx.weights]\nfocus = 0.4\n").unwrap();
        assert_eq!(config.dx.max_daily_rate, 10.0);
        assert_eq!(config.dx.weights.focus, 0.4);
        assert_eq!(config.dx.weights.throughput, 0.25);
    }

    #[test]
    fn dx_weights_use_snake_case_keys() {
        let config = VitalsConfig::from_toml(
            "[dx.weights]\nfeedback_delay = 0.5\ncognitive_load = 0.0\n",
        )
        .unwrap();
        assert_eq!(config.dx.weights.feedback_delay, 0.5);
        assert_eq!(config.dx.weights.cognitive_load, 0.0);
        assert_eq!(config.dx.weights.throughput, 0.25);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[window]
days = 30

[history]
max_files_per_commit = 50
branch = "main"

[knowledge]
island_threshold = 0.9

[coupling]
min_shared_commits = 3

[clustering]
seed = 7
k = 4

[effort]
alpha = 1.5

[dx.label_weights]
bugfix = 0.6
"#;
        let config = VitalsConfig::from_toml(toml).unwrap();
        assert_eq!(config.window.days, 30);
        assert_eq!(config.history.branch.as_deref(), Some("main"));
        assert_eq!(config.knowledge.island_threshold, 0.9);
        assert_eq!(config.knowledge.half_life_days, 90.0);
        assert_eq!(config.coupling.min_shared_commits, 3);
        assert_eq!(config.clustering.seed, 7);
        assert_eq!(config.clustering.k, Some(4));
        assert_eq!(config.effort.alpha, Some(1.5));
        assert_eq!(config.dx.label_weights.bugfix, 0.6);
        assert_eq!(config.dx.label_weights.refactoring, 0.8);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = VitalsConfig::from_toml("").unwrap();
        assert_eq!(config.window.days, 90);
        assert_eq!(config.clustering.seed, 42);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = VitalsConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }
}
