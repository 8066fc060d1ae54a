//! Safe mutation of object metadata
//!
//! The store cannot patch custom metadata in place; replacement rides a
//! server-side self-copy. To make that mutation safe against partial failure
//! the updater works in a backup/verify/replace/verify sequence:
//!
//! 1. skip if the key is already set (unless forced),
//! 2. download the body and derive the freshness value,
//! 3. copy the object to `<key>.backup` and prove the backup identical
//!    (ETag comparison) before anything is mutated,
//! 4. self-copy with a replaced metadata map, preserving ContentType,
//! 5. prove the payload unchanged (ETag vs backup) and drop the backup.
//!
//! Any ETag disagreement is a fatal integrity violation; in that case the
//! backup object is deliberately left in place as the recovery artifact.
//! The copy windows run inside [`CriticalSection`] so an interrupt cannot
//! strand a half-applied update.

use crate::critical::CriticalSection;
use crate::error::{Result, SyncError};
use crate::timestamp::TimestampExtractor;
use cds_common::ObjectRef;
use cds_store::Storage;
use tracing::{debug, info, instrument, warn};

/// Suffix of the backup object taken before a metadata mutation.
pub const BACKUP_SUFFIX: &str = ".backup";

/// How the freshness value is obtained.
#[derive(Debug, Clone)]
pub enum TimestampSpec {
    /// Scan the object's JSONL records for the field `ts_key`.
    FromRecords { ts_key: String, scan_all_lines: bool },
    /// Use an externally supplied, already formatted value.
    Explicit(String),
}

/// Why an update did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The metadata key is already present and `force` was not set.
    AlreadySet,
}

/// Non-fatal result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    Updated { value: String },
    Skipped(SkipReason),
}

pub struct MetadataUpdater {
    store: Storage,
    metadata_key: String,
}

impl MetadataUpdater {
    pub fn new(store: Storage, metadata_key: impl Into<String>) -> Self {
        Self {
            store,
            metadata_key: metadata_key.into(),
        }
    }

    /// Set the freshness metadata on `object` if it is not already set.
    ///
    /// `output` redirects the rewritten object to a different destination
    /// (the source is left untouched in that case). Fatal integrity
    /// violations surface as [`SyncError::Integrity`]; everything non-fatal
    /// is a [`MetadataOutcome`].
    #[instrument(skip(self))]
    pub async fn update_metadata_if_needed(
        &self,
        object: &ObjectRef,
        spec: &TimestampSpec,
        output: Option<&ObjectRef>,
        force: bool,
    ) -> Result<MetadataOutcome> {
        let info = self
            .store
            .head(object)
            .await?
            .ok_or_else(|| SyncError::precondition(format!("object does not exist: {object}")))?;

        if info.metadata.contains_key(&self.metadata_key) && !force {
            info!(
                key = %self.metadata_key,
                "Metadata already set on {}, skipping", object
            );
            return Ok(MetadataOutcome::Skipped(SkipReason::AlreadySet));
        }

        // The body is always downloaded, even when the value is supplied
        // externally: the integrity check path requires a local re-derivation
        // to stay possible.
        let scratch = tempfile::Builder::new()
            .suffix(compression_suffix(object.key()))
            .tempfile()?;
        self.store.download_to_file(object, scratch.path()).await?;

        let value = match spec {
            TimestampSpec::FromRecords {
                ts_key,
                scan_all_lines,
            } => {
                let extractor = TimestampExtractor::new(ts_key, *scan_all_lines)?;
                let extracted = extractor.extract_from_file(scratch.path())?;
                if extracted.skipped_records > 0 {
                    debug!(
                        skipped = extracted.skipped_records,
                        "Skipped malformed records while extracting timestamp"
                    );
                }
                extracted.value
            }
            TimestampSpec::Explicit(value) => value.clone(),
        };

        let backup = object.with_suffix(BACKUP_SUFFIX);
        debug!("Creating backup of {} at {}", object, backup);
        {
            let _guard = CriticalSection::enter();
            self.store.copy(object, &backup).await?;
        }

        let original_etag = self.head_etag(object).await?;
        let backup_etag = self.head_etag(&backup).await?;
        if original_etag != backup_etag {
            return Err(SyncError::integrity(format!(
                "backup of {object} is not identical to the original \
                 (original ETag {original_etag:?}, backup ETag {backup_etag:?}); aborting \
                 before mutation"
            )));
        }
        debug!("Backup verified for {}", object);

        let mut updated_metadata = info.metadata.clone();
        updated_metadata.insert(self.metadata_key.clone(), value.clone());

        let dest = output.unwrap_or(object);
        info!(
            key = %self.metadata_key,
            value = %value,
            "Setting freshness metadata on {}", dest
        );
        {
            let _guard = CriticalSection::enter();
            self.store
                .copy_replace_metadata(
                    object,
                    dest,
                    updated_metadata,
                    Some(
                        info.content_type
                            .clone()
                            .unwrap_or_else(|| "application/octet-stream".to_string()),
                    ),
                )
                .await?;
        }

        let updated_etag = self.head_etag(object).await?;
        if updated_etag != backup_etag {
            return Err(SyncError::integrity(format!(
                "payload of {object} changed during metadata update \
                 (ETag {updated_etag:?} != backup ETag {backup_etag:?}); backup retained \
                 at {backup}"
            )));
        }

        {
            let _guard = CriticalSection::enter();
            if let Err(err) = self.store.delete(&backup).await {
                warn!(error = %err, "Failed to delete backup object {}", backup);
            }
        }

        debug!("Metadata updated on {}", dest);
        Ok(MetadataOutcome::Updated { value })
    }

    async fn head_etag(&self, object: &ObjectRef) -> Result<Option<String>> {
        Ok(self
            .store
            .head(object)
            .await?
            .ok_or_else(|| SyncError::precondition(format!("object disappeared: {object}")))?
            .etag)
    }
}

/// Scratch-file suffix preserving the compression extension, so the record
/// scanner picks the right decoder.
fn compression_suffix(key: &str) -> &'static str {
    if key.ends_with(".jsonl.bz2") {
        ".jsonl.bz2"
    } else if key.ends_with(".jsonl.gz") {
        ".jsonl.gz"
    } else {
        ".jsonl"
    }
}
