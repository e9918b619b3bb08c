//! Error types for pdfbatch

use thiserror::Error;

/// pdfbatch error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Contract violation at a call site (e.g. batch path without batch data)
    #[error("Logic error: {0}")]
    Logic(String),

    /// Contract violation when constructing an object
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
