use std::path::PathBuf;

/// Errors that can occur across the Vitals engines.
///
/// The analytics engines themselves are total over well-formed input and
/// never return these; they surface from configuration loading, change
/// sources, reference resolution, and report sinks. The binary crate
/// converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use vitals_core::VitalsError;
///
/// let err = VitalsError::UnresolvableRef("v9.9.9".into());
/// assert!(err.to_string().contains("v9.9.9"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum VitalsError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// A reference could not be mapped to a point in time.
    #[error("unresolvable reference: {0}")]
    #[diagnostic(help("use an ISO date (YYYY-MM-DD), an RFC 3339 timestamp, or a revision known to the repository"))]
    UnresolvableRef(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
