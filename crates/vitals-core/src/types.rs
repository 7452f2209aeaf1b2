use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A single file change within a commit.
///
/// Produced once per commit × file by a change source and never mutated.
/// Grouping by `commit_hash` recovers commit-level facts.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::ChangeEvent;
///
/// let event = ChangeEvent {
///     commit_hash: "c1".into(),
///     timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
///     file_path: "src/main.rs".into(),
///     lines_added: 10,
///     lines_deleted: 3,
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
/// };
/// assert_eq!(event.churn(), 13);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Commit identifier.
    pub commit_hash: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// File path relative to repo root.
    pub file_path: String,
    /// Lines added in this commit.
    pub lines_added: u64,
    /// Lines deleted in this commit.
    pub lines_deleted: u64,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
}

impl ChangeEvent {
    /// Lines added + lines deleted.
    pub fn churn(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

/// The time span every report is scoped to.
///
/// `to - from == window_days` for windows built with [`AnalysisWindow::ending_at`].
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_core::AnalysisWindow;
///
/// let to = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
/// let window = AnalysisWindow::ending_at(to, 90);
/// assert_eq!((window.to - window.from).num_days(), 90);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWindow {
    /// Inclusive start of the window.
    pub from: DateTime<Utc>,
    /// Inclusive end of the window; recency is measured from here.
    pub to: DateTime<Utc>,
    /// Window length in days.
    pub window_days: u32,
}

impl AnalysisWindow {
    /// Build a window of `window_days` ending at `to`.
    pub fn ending_at(to: DateTime<Utc>, window_days: u32) -> Self {
        Self {
            from: to - Duration::days(i64::from(window_days)),
            to,
            window_days,
        }
    }

    /// Whether `timestamp` falls inside the window (both ends inclusive).
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }

    /// Keep only the events inside the window.
    pub fn scope(&self, events: &[ChangeEvent]) -> Vec<ChangeEvent> {
        events
            .iter()
            .filter(|e| self.contains(e.timestamp))
            .cloned()
            .collect()
    }

    /// Fractional days between `timestamp` and the window end, never negative.
    pub fn age_days(&self, timestamp: DateTime<Utc>) -> f64 {
        let seconds = (self.to - timestamp).num_seconds() as f64;
        (seconds / SECONDS_PER_DAY).max(0.0)
    }

    /// The instant halfway between `from` and `to`.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.from + (self.to - self.from) / 2
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use vitals_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
