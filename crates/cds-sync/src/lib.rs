//! Synchronization core for CDS
//!
//! Implements the coordination and integrity protocols that make corpus
//! publication safe over a store with no transactions and no native locking:
//!
//! - [`wip`]: advisory mutual exclusion via WIP marker objects
//! - [`transfer`]: checksum-verified uploads/downloads with bounded retry
//! - [`metadata`]: backup/verify/replace/verify metadata mutation
//! - [`timestamp`]: freshness timestamps extracted from JSONL records
//! - [`orchestrator`]: the end-to-end publish policy composing the above
//! - [`critical`]: interrupt deferral across non-resumable store mutations

pub mod critical;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod timestamp;
pub mod transfer;
pub mod wip;

pub use error::{Result, SyncError};
pub use metadata::{MetadataOutcome, MetadataUpdater, SkipReason, TimestampSpec};
pub use orchestrator::{
    pair_up, FilePair, PairReport, TransferItem, TransferOutcome, TsKey, UploadOptions,
    UploadOrchestrator,
};
pub use timestamp::{ExtractedTimestamp, TimestampExtractor, DEFAULT_METADATA_KEY, TS_FORMAT};
pub use transfer::RetryingTransfer;
pub use wip::{AcquireOutcome, WipLock, WipMarker, WipStatus};
