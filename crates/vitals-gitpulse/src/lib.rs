//! Git history analytics: hotspots, knowledge concentration, temporal
//! coupling, and snapshot comparison.
//!
//! Every engine here is a pure function of an in-memory slice of
//! [`ChangeEvent`](vitals_core::ChangeEvent)s scoped to one
//! [`AnalysisWindow`](vitals_core::AnalysisWindow). Retrieving those events
//! is the job of a [`ChangeSource`](source::ChangeSource); the git2-backed
//! [`GitSource`](mining::GitSource) is the default one.

pub mod commits;
pub mod compare;
pub mod coupling;
pub mod hotspots;
pub mod knowledge;
pub mod mining;
pub mod source;
