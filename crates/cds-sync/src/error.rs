//! Error taxonomy for the synchronization core
//!
//! Three classes of failure flow through this crate:
//!
//! - transient conditions (retried locally, surfaced as `Ok(false)` outcomes),
//! - integrity violations ([`SyncError::Integrity`]): the store behaved
//!   outside its contract; always fatal, never auto-recovered,
//! - precondition errors ([`SyncError::Precondition`]): bad input detected
//!   before any store mutation.

use thiserror::Error;

/// Result type alias for synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The store returned data inconsistent with what was written or backed
    /// up. Requires operator attention; any backup artifact is preserved.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Invalid input, rejected before touching the store.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cds_common::CdsError),

    /// Store operation failure (network, auth, service errors).
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SyncError {
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// True for violations that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::Precondition(_))
    }
}
