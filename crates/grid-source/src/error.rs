//! Error types for gridded data sources.

use thiserror::Error;

/// Errors raised by a gridded data source.
///
/// All of these are fatal to the current run; no retries are performed.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to open the data source.
    #[error("failed to open source: {0}")]
    OpenFailed(String),

    /// Failed to read data from the source.
    #[error("failed to read source data: {0}")]
    ReadFailed(String),

    /// Invalid or missing metadata in the source.
    #[error("invalid source metadata: {0}")]
    InvalidMetadata(String),

    /// The requested sub-block does not intersect the source grid.
    #[error("requested block {requested} is outside source extent {extent}")]
    EmptyBlock { requested: String, extent: String },

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SourceError {
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
