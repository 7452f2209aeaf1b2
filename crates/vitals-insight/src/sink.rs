//! Persistence of finished reports.

use std::path::{Path, PathBuf};

use tracing::debug;
use vitals_core::VitalsError;

use crate::pipeline::HealthReport;

/// Destination for finished [`HealthReport`]s.
pub trait ReportSink {
    /// Store `report` under `run_id`.
    fn store(&self, run_id: &str, report: &HealthReport) -> Result<(), VitalsError>;
}

/// Writes each report as pretty JSON to `<dir>/<run_id>.json`.
///
/// The directory is created on first use.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a report for `run_id` is written to.
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

impl ReportSink for JsonDirSink {
    fn store(&self, run_id: &str, report: &HealthReport) -> Result<(), VitalsError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(run_id);
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), "report stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze_window;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use vitals_core::{AnalysisWindow, VitalsConfig};

    #[test]
    fn stores_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonDirSink::new(dir.path().join("runs"));
        let window =
            AnalysisWindow::ending_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 30);
        let report = analyze_window(
            &[],
            &window,
            &HashMap::new(),
            &HashMap::new(),
            &VitalsConfig::default(),
        );

        sink.store("run-1", &report).unwrap();

        let content = std::fs::read_to_string(sink.path_for("run-1")).unwrap();
        let back: HealthReport = serde_json::from_str(&content).unwrap();
        assert_eq!(back, report);
        assert!(content.contains("\"totalCommits\""));
    }
}
