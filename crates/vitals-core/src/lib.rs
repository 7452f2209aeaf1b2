//! Core types, configuration, and error handling for the Vitals engines.
//!
//! This crate provides the shared foundation used by all other Vitals crates:
//! - [`VitalsError`]: unified error type using `thiserror`
//! - [`VitalsConfig`]: configuration loaded from `.vitals.toml`
//! - Shared types: [`ChangeEvent`], [`AnalysisWindow`], [`OutputFormat`]
//! - [`math`]: deterministic numeric helpers shared by the engines

mod config;
mod error;
pub mod math;
mod types;

pub use config::{
    ClusteringConfig, CouplingConfig, DxConfig, DxWeights, EffortConfig, HistoryConfig,
    HotspotConfig, KnowledgeConfig, LabelWeights, VitalsConfig, WindowConfig,
};
pub use error::VitalsError;
pub use types::{AnalysisWindow, ChangeEvent, OutputFormat};

/// A convenience `Result` type for Vitals operations.
pub type Result<T> = std::result::Result<T, VitalsError>;
