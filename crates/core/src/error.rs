//! Error types for gridzonal

use thiserror::Error;

/// Main error type for gridzonal operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run cannot decide whether inputs are aligned (e.g. the raster carries no CRS)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Pixel array dimensions disagree with the declared raster size
    #[error("Raster shape mismatch: array is {rows}x{cols}, declared {height}x{width}")]
    InputShape {
        rows: usize,
        cols: usize,
        width: usize,
        height: usize,
    },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Unsupported raster orientation: {0}")]
    Orientation(String),

    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    #[error("Duplicate polygon identifier: {0}")]
    DuplicateId(String),

    #[error("Invalid vector data: {0}")]
    Vector(String),

    /// Every row of the result is absent, there is no value to fill from
    #[error("No polygon produced a value ({rows} rows), gaps cannot be filled")]
    UnresolvableGap { rows: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gridzonal operations
pub type Result<T> = std::result::Result<T, Error>;
