//! Error types for the mooring conversion library.

use thiserror::Error;

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing instrument files or writing archives.
///
/// Field classification anomalies are not errors: they are collected in a
/// [`ClassificationReport`](crate::classify::ClassificationReport) and the
/// conversion continues.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed text record or unparseable date/time
    #[error("Parse error: {0}")]
    Parse(String),

    /// A field or setting the loader expects is missing or has the wrong kind
    #[error("Schema error: {0}")]
    Schema(String),

    /// Array shape disagrees with an existing dimension
    #[error("Shape error: {0}")]
    Shape(String),

    /// Deployment metadata failed validation
    #[error("Invalid deployment metadata: {0}")]
    ConfigValidation(String),

    /// Archive encoding or decoding error (Arrow / Parquet)
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Shape(err.to_string())
    }
}

impl From<glob::GlobError> for Error {
    fn from(err: glob::GlobError) -> Self {
        Error::Io(err.into())
    }
}
