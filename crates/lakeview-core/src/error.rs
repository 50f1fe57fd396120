//! Error types for lakeview.

use thiserror::Error;

/// The main error type for lakeview operations.
#[derive(Error, Debug)]
pub enum LakeviewError {
    /// The water grid needs at least two samples per side.
    #[error("invalid water tessellation {0}: need at least 2 samples per side")]
    InvalidTessellation(u32),

    /// A camera forward direction that is zero or parallel to world up.
    #[error("degenerate camera orientation")]
    DegenerateCamera,

    /// Invalid scene configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for lakeview operations.
pub type Result<T> = std::result::Result<T, LakeviewError>;
