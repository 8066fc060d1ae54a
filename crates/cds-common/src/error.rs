//! Error types for CDS

use thiserror::Error;

/// Result type alias for CDS operations
pub type Result<T> = std::result::Result<T, CdsError>;

/// Main error type for CDS
#[derive(Error, Debug)]
pub enum CdsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Invalid object store URI: {0}")]
    InvalidUri(String),

    #[error("Unknown timestamp key: {0}")]
    UnknownTimestampKey(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
