//! Checksum-verified transfers with bounded retry
//!
//! A transfer only counts as successful once the destination has been read
//! back and its digest matches the source. Uploads never write the published
//! key directly: bytes are staged at `<key>.tmp`, verified there, and promoted
//! with a server-side copy. A direct overwrite that dies midway would leave
//! the destination truncated with no server-side undo; staging bounds the
//! observable damage to the temp object.

use crate::error::{Result, SyncError};
use cds_common::checksum::compute_file_checksum;
use cds_common::ObjectRef;
use cds_store::Storage;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Suffix of the staging object an upload writes before promotion.
pub const TMP_SUFFIX: &str = ".tmp";

/// Default number of attempts before a transfer is reported failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct RetryingTransfer {
    store: Storage,
    max_attempts: u32,
    delay: Duration,
}

impl RetryingTransfer {
    pub fn new(store: Storage, max_attempts: u32, delay: Duration) -> Self {
        Self {
            store,
            max_attempts,
            delay,
        }
    }

    /// Upload a local file so that on `Ok(true)` the destination is
    /// byte-identical to the source.
    ///
    /// Each attempt stages at `<dest>.tmp`, digests the staged object by
    /// streaming it back, and only promotes (server-side copy with
    /// metadata-replace, so stale metadata is never inherited) on a match.
    /// A digest mismatch on the *promoted* object is a hard
    /// [`SyncError::Integrity`]: that is store corruption, not a transient
    /// condition, and is never retried. The temp object is deleted on every
    /// exit path. Exhausting all attempts returns `Ok(false)`; the caller
    /// decides whether that is fatal.
    #[instrument(skip(self))]
    pub async fn upload_with_retry(&self, local_path: &Path, dest: &ObjectRef) -> Result<bool> {
        let local_digest = compute_file_checksum(local_path)?;
        let tmp = dest.with_suffix(TMP_SUFFIX);

        for attempt in 1..=self.max_attempts {
            let outcome = self.upload_attempt(local_path, dest, &tmp, &local_digest).await;

            // The temp object must not outlive the attempt, whatever happened.
            if let Err(err) = self.store.delete(&tmp).await {
                warn!(error = %err, "Failed to delete temporary upload object {}", tmp);
            }

            match outcome {
                Ok(true) => {
                    info!(digest = %local_digest, "Verified upload of {} to {}", local_path.display(), dest);
                    return Ok(true);
                }
                Ok(false) => {
                    warn!(attempt, "Checksum mismatch uploading to {}", dest);
                }
                Err(err @ SyncError::Integrity(_)) => {
                    error!(error = %err, "Aborting after integrity violation on {}", dest);
                    return Err(err);
                }
                Err(err) => {
                    error!(error = %err, attempt, "Upload attempt failed for {}", dest);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        error!(
            "Failed to upload {} to {} after {} attempts",
            local_path.display(),
            dest,
            self.max_attempts
        );
        Ok(false)
    }

    async fn upload_attempt(
        &self,
        local_path: &Path,
        dest: &ObjectRef,
        tmp: &ObjectRef,
        local_digest: &str,
    ) -> Result<bool> {
        self.store.upload_file(tmp, local_path).await?;

        let staged_digest = self.store.checksum(tmp).await?;
        if staged_digest != local_digest {
            warn!(
                local = %local_digest,
                staged = %staged_digest,
                "Staged object digest does not match local file"
            );
            return Ok(false);
        }

        self.store
            .copy_replace_metadata(tmp, dest, HashMap::new(), None)
            .await?;

        let published_digest = self.store.checksum(dest).await?;
        if published_digest != local_digest {
            return Err(SyncError::integrity(format!(
                "digest mismatch after promoting {dest}: local {local_digest} != published \
                 {published_digest}; the published object is probably corrupted"
            )));
        }

        Ok(true)
    }

    /// Download an object so that on `Ok(true)` the local file is
    /// byte-identical to the remote object.
    ///
    /// The remote digest is computed once up front; each attempt downloads
    /// and compares. Exhausting all attempts returns `Ok(false)`.
    #[instrument(skip(self))]
    pub async fn download_with_retry(&self, src: &ObjectRef, local_path: &Path) -> Result<bool> {
        let remote_digest = self.store.checksum(src).await?;

        for attempt in 1..=self.max_attempts {
            match self.download_attempt(src, local_path, &remote_digest).await {
                Ok(true) => {
                    info!(digest = %remote_digest, "Verified download of {} to {}", src, local_path.display());
                    return Ok(true);
                }
                Ok(false) => {
                    warn!(attempt, "Checksum mismatch downloading {}", src);
                }
                Err(err) => {
                    error!(error = %err, attempt, "Download attempt failed for {}", src);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        error!(
            "Failed to download and verify {} after {} attempts",
            src, self.max_attempts
        );
        Ok(false)
    }

    async fn download_attempt(
        &self,
        src: &ObjectRef,
        local_path: &Path,
        remote_digest: &str,
    ) -> Result<bool> {
        self.store.download_to_file(src, local_path).await?;
        let local_digest = compute_file_checksum(local_path)?;
        Ok(local_digest == remote_digest)
    }
}
