//! Change-source contract and an in-memory implementation.
//!
//! The engines never talk to a version-control backend directly; they
//! consume what a [`ChangeSource`] has already materialized.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use vitals_core::{ChangeEvent, VitalsError};

/// Provider of change history, file sizes, and reference resolution.
pub trait ChangeSource {
    /// All change events with `since <= timestamp <= until`.
    ///
    /// # Errors
    ///
    /// Backend-specific failures (e.g. [`VitalsError::Git`]).
    fn changes(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>, VitalsError>;

    /// File sizes in bytes as of `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::UnresolvableRef`] if `reference` is unknown.
    fn file_sizes(&self, reference: &str) -> Result<HashMap<String, u64>, VitalsError>;

    /// Map a reference (tag, branch, commit, ...) to a point in time.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::UnresolvableRef`] if `reference` is unknown.
    fn resolve_ref(&self, reference: &str) -> Result<DateTime<Utc>, VitalsError>;
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
///
/// # Examples
///
/// ```
/// use vitals_gitpulse::source::parse_iso_reference;
///
/// let date = parse_iso_reference("2024-03-15").unwrap();
/// assert_eq!(date.to_rfc3339(), "2024-03-15T00:00:00+00:00");
/// assert!(parse_iso_reference("v1.2.0").is_none());
/// ```
pub fn parse_iso_reference(reference: &str) -> Option<DateTime<Utc>> {
    let reference = reference.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(reference) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve a reference: ISO literals directly, everything else via `source`.
///
/// # Errors
///
/// Propagates [`VitalsError::UnresolvableRef`] from the source.
pub fn resolve_reference<S: ChangeSource + ?Sized>(
    source: &S,
    reference: &str,
) -> Result<DateTime<Utc>, VitalsError> {
    match parse_iso_reference(reference) {
        Some(ts) => Ok(ts),
        None => source.resolve_ref(reference),
    }
}

/// A change source backed by an already-materialized event list.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitals_gitpulse::source::{ChangeSource, MemorySource};
///
/// let release = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
/// let source = MemorySource::new(Vec::new()).with_ref("v1.0", release);
/// assert_eq!(source.resolve_ref("v1.0").unwrap(), release);
/// assert!(source.resolve_ref("v2.0").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    events: Vec<ChangeEvent>,
    sizes: HashMap<String, u64>,
    refs: HashMap<String, DateTime<Utc>>,
}

impl MemorySource {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Sizes reported for every reference.
    pub fn with_sizes(mut self, sizes: HashMap<String, u64>) -> Self {
        self.sizes = sizes;
        self
    }

    /// Register a named reference.
    pub fn with_ref(mut self, name: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.refs.insert(name.into(), at);
        self
    }
}

impl ChangeSource for MemorySource {
    fn changes(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>, VitalsError> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.timestamp >= since && e.timestamp <= until)
            .cloned()
            .collect())
    }

    fn file_sizes(&self, _reference: &str) -> Result<HashMap<String, u64>, VitalsError> {
        Ok(self.sizes.clone())
    }

    fn resolve_ref(&self, reference: &str) -> Result<DateTime<Utc>, VitalsError> {
        self.refs
            .get(reference)
            .copied()
            .ok_or_else(|| VitalsError::UnresolvableRef(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_reference_keeps_time_of_day() {
        let ts = parse_iso_reference("2024-03-15T10:30:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn resolve_reference_prefers_iso_literal() {
        let source = MemorySource::new(Vec::new())
            .with_ref("2024-01-01", Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap());
        let ts = resolve_reference(&source, "2024-01-01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn unknown_reference_is_unresolvable() {
        let source = MemorySource::default();
        let err = resolve_reference(&source, "no-such-tag").unwrap_err();
        assert!(matches!(err, VitalsError::UnresolvableRef(r) if r == "no-such-tag"));
    }

    #[test]
    fn memory_source_filters_by_range() {
        let event = |day: u32| ChangeEvent {
            commit_hash: format!("c{day}"),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            file_path: "a.rs".into(),
            lines_added: 1,
            lines_deleted: 0,
            author_name: "alice".into(),
            author_email: "alice@example.com".into(),
        };
        let source = MemorySource::new(vec![event(1), event(5), event(9)]);
        let got = source
            .changes(
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(got.len(), 2);
    }
}
