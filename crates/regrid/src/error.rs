//! Error types for the regridding engine.

use grid_common::axis::AxisError;
use grid_source::SourceError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors raised by the regridding engine.
///
/// Geometry, projection, configuration and storage errors are fatal;
/// per-variable resolution failures and domain mismatches are not
/// errors at all (they degrade to omission or all-missing output).
#[derive(Error, Debug)]
pub enum RegridError {
    /// Source grid geometry is unusable; the dataset cannot be built.
    #[error("geometry error in dataset '{dataset}': {source}")]
    Geometry {
        dataset: String,
        #[source]
        source: AxisError,
    },

    /// The source's grid mapping could not be turned into a transform.
    #[error("projection error in dataset '{dataset}': {source}")]
    Projection {
        dataset: String,
        #[source]
        source: ProjectionError,
    },

    /// Malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid target grid parameters.
    #[error("invalid target grid: {0}")]
    Target(String),

    /// Two fields that must be co-located have different shapes.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Storage/IO failure from a gridded source (fatal, no retry).
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl From<toml::de::Error> for RegridError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for RegridError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for regridding operations.
pub type Result<T> = std::result::Result<T, RegridError>;
