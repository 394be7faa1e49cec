use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A retained column is absent from the input header.
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    /// A lookup table file could not be located.
    #[error("lookup table not found at {path}")]
    LookupTableNotFound { path: PathBuf },

    /// Status table keys must be integer codes.
    #[error("navigational status table key is not an integer code: {key:?}")]
    InvalidStatusCode { key: String },

    #[error("simplification tolerance must be finite and non-negative, got {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
