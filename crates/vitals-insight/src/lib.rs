//! Work-type clustering, effort modelling, and the DX composite.
//!
//! Builds on the per-file reports from `vitals-gitpulse`:
//! - [`cluster`] groups commits into work types with seeded k-means++
//! - [`effort`] fits a ridge-regression effort proxy per file
//! - [`dx`] folds everything into a single developer-experience score
//! - [`pipeline`] runs every engine over one analysis window

pub mod cluster;
pub mod dx;
pub mod effort;
pub mod features;
pub mod kmeans;
pub mod pipeline;
pub mod regression;
pub mod sink;
