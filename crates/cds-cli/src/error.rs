//! Error types for the CDS CLI
//!
//! User-facing errors with actionable messages. Fatal conditions always
//! surface a clear reason before the process exits non-zero.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Bad invocation or configuration, detected before any store mutation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A transfer exhausted its retries without a verified copy
    #[error("Transfer failed: {0}. The destination was not verified; re-run to retry.")]
    TransferFailed(String),

    /// Malformed URI or other shared-layer error
    #[error(transparent)]
    Common(#[from] cds_common::CdsError),

    /// Synchronization-core failure (integrity violations land here)
    #[error(transparent)]
    Sync(#[from] cds_sync::SyncError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Generic store/client error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::TransferFailed(msg.into())
    }
}
