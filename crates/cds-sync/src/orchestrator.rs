//! End-to-end publish workflow for file pairs
//!
//! Composes the WIP lock, the retrying transfer, and the metadata updater
//! into the "publish a content file and its companion log" policy. Pairs are
//! processed strictly in input order, and a content file is always fully
//! resolved before its companion log is considered: a log is only ever
//! published when its content sibling was uploaded in the same run.

use crate::error::{Result, SyncError};
use crate::metadata::{MetadataOutcome, MetadataUpdater, TimestampSpec, BACKUP_SUFFIX};
use crate::timestamp::{DEFAULT_METADATA_KEY, TS_FORMAT};
use crate::transfer::{RetryingTransfer, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, TMP_SUFFIX};
use crate::wip::{AcquireOutcome, WipLock, WipMarker, WIP_SUFFIX};
use cds_common::stamp::{file_mtime, is_stamp_file, keep_timestamp_only};
use cds_common::ObjectRef;
use cds_store::Storage;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Extensions identifying real corpus data files (as opposed to logs).
/// WIP markers are only maintained for these.
pub const DATA_FILE_EXTENSIONS: &[&str] = &[".txt.gz", ".jsonl.bz2"];

/// Suffixes a companion log may carry on top of its content file's name.
pub const LOG_SUFFIXES: &[&str] = &[".log.gz", ".log"];

/// Protocol-reserved suffixes that may never be upload sources.
pub const FORBIDDEN_EXTENSIONS: &[&str] = &[WIP_SUFFIX, TMP_SUFFIX, BACKUP_SUFFIX];

/// Per-element result of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Uploaded,
    SkippedAlreadyExists,
    SkippedStampFile,
    SkippedUpToDate,
    Failed,
}

impl TransferOutcome {
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Self::SkippedAlreadyExists | Self::SkippedStampFile | Self::SkippedUpToDate
        )
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploaded => "uploaded",
            Self::SkippedAlreadyExists => "skipped (already exists)",
            Self::SkippedStampFile => "skipped (stamp file)",
            Self::SkippedUpToDate => "skipped (up to date)",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One local file and its intended destination.
#[derive(Debug, Clone)]
pub struct TransferItem {
    pub local: PathBuf,
    pub remote: ObjectRef,
}

/// A content file with an optional dependent companion log.
#[derive(Debug, Clone)]
pub struct FilePair {
    pub content: TransferItem,
    pub log: Option<TransferItem>,
}

/// Outcome report for one processed pair.
#[derive(Debug, Clone)]
pub struct PairReport {
    pub content: TransferItem,
    pub content_outcome: TransferOutcome,
    pub log: Option<(TransferItem, TransferOutcome)>,
}

/// Timestamp key selecting how freshness values are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsKey {
    /// `ts` record field.
    Ts,
    /// `cdt` record field.
    Cdt,
    /// Use the local file's modification time (`__file__`).
    FileModified,
}

impl FromStr for TsKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ts" => Ok(Self::Ts),
            "cdt" => Ok(Self::Cdt),
            "__file__" => Ok(Self::FileModified),
            other => Err(cds_common::CdsError::UnknownTimestampKey(other.to_string()).into()),
        }
    }
}

impl fmt::Display for TsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ts => "ts",
            Self::Cdt => "cdt",
            Self::FileModified => "__file__",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct TimestampOptions {
    pub ts_key: TsKey,
    pub metadata_key: String,
}

impl Default for TimestampOptions {
    fn default() -> Self {
        Self {
            ts_key: TsKey::Ts,
            metadata_key: DEFAULT_METADATA_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WipOptions {
    /// Maximum marker age in hours before it is considered stale.
    pub max_age_hours: f64,
    /// Remove the marker once the pair is resolved.
    pub remove_after: bool,
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Overwrite destinations even when they already exist.
    pub force_overwrite: bool,
    /// Compare the local mtime against the destination's freshness metadata
    /// and transfer only when the local file is newer.
    pub upload_if_newer: bool,
    /// Truncate local `.jsonl.bz2` files after a verified upload, keeping
    /// only their mtime.
    pub keep_timestamp_only: bool,
    /// Stamp freshness metadata on uploaded objects.
    pub set_timestamp: Option<TimestampOptions>,
    /// Coordinate with concurrent runs through WIP markers.
    pub wip: Option<WipOptions>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            force_overwrite: false,
            upload_if_newer: false,
            keep_timestamp_only: false,
            set_timestamp: None,
            wip: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// True for names the WIP protocol treats as corpus data files.
pub fn is_data_file(name: &str) -> bool {
    DATA_FILE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// True when `candidate` names a companion log of `content_name`: the log's
/// name extends the content's name and ends in a recognized log suffix.
pub fn is_companion_log(content_name: &str, candidate: &str) -> bool {
    candidate.len() > content_name.len()
        && candidate.starts_with(content_name)
        && LOG_SUFFIXES.iter().any(|suffix| candidate.ends_with(suffix))
}

fn local_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Group a flat, ordered item list into content/log pairs.
///
/// An item directly following a content file whose name structurally marks it
/// as that file's log becomes the pair's companion; everything else stands
/// alone.
pub fn pair_up(items: Vec<TransferItem>) -> Vec<FilePair> {
    let mut pairs = Vec::new();
    let mut iter = items.into_iter().peekable();

    while let Some(content) = iter.next() {
        let content_name = local_name(&content.local);
        let log = match iter.peek() {
            Some(next) if is_companion_log(&content_name, &local_name(&next.local)) => iter.next(),
            _ => None,
        };
        pairs.push(FilePair { content, log });
    }

    pairs
}

/// What the policy decided for a content element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlannedAction {
    Upload,
    Skip(TransferOutcome),
}

#[derive(Debug, Clone)]
pub(crate) struct LocalFileState {
    pub is_stamp: bool,
    pub mtime: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct RemoteFileState {
    /// Freshness metadata value, when present and parseable.
    pub freshness: Option<NaiveDateTime>,
    /// Store-assigned physical write time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Policy decision for a content file. Companion logs bypass this: they are
/// force-uploaded iff their sibling was uploaded.
///
/// Stamp files are recognized before the force flag: a placeholder is never
/// real content, even under force.
pub(crate) fn decide_content(
    local: &LocalFileState,
    remote: Option<&RemoteFileState>,
    options: &UploadOptions,
) -> PlannedAction {
    if options.upload_if_newer && local.is_stamp {
        return PlannedAction::Skip(TransferOutcome::SkippedStampFile);
    }
    if options.force_overwrite {
        return PlannedAction::Upload;
    }
    let Some(remote) = remote else {
        return PlannedAction::Upload;
    };
    if !options.upload_if_newer {
        return PlannedAction::Skip(TransferOutcome::SkippedAlreadyExists);
    }

    // Freshness metadata is the logical content time; the physical write
    // time only stands in when no metadata was ever stamped.
    let remote_ts = remote
        .freshness
        .or_else(|| remote.last_modified.map(|lm| lm.naive_utc()));
    match remote_ts {
        Some(ts) if local.mtime.naive_utc() > ts => PlannedAction::Upload,
        Some(_) => PlannedAction::Skip(TransferOutcome::SkippedUpToDate),
        None => PlannedAction::Upload,
    }
}

fn local_state(path: &Path) -> Result<LocalFileState> {
    let meta = std::fs::metadata(path)?;
    Ok(LocalFileState {
        is_stamp: is_stamp_file(path, meta.len()),
        mtime: file_mtime(path)?,
    })
}

/// Reject bad input before any store mutation is attempted.
pub fn validate_pairs(pairs: &[FilePair], options: &UploadOptions) -> Result<()> {
    for pair in pairs {
        let items = std::iter::once(&pair.content).chain(pair.log.as_ref());
        for item in items {
            let name = local_name(&item.local);
            if FORBIDDEN_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                return Err(SyncError::precondition(format!(
                    "refusing to upload {}: protocol-reserved extension",
                    item.local.display()
                )));
            }
            if !item.local.exists() {
                return Err(SyncError::precondition(format!(
                    "local file not found: {}",
                    item.local.display()
                )));
            }
        }

        // A zero-byte content file is only meaningful as a stamp, which
        // requires the upload-if-newer policy to be active.
        if !options.upload_if_newer {
            let len = std::fs::metadata(&pair.content.local)?.len();
            if len == 0 {
                return Err(SyncError::precondition(format!(
                    "zero-length content file presented as real content: {}",
                    pair.content.local.display()
                )));
            }
        }
    }
    Ok(())
}

pub struct UploadOrchestrator {
    store: Storage,
    transfer: RetryingTransfer,
    wip: WipLock,
    options: UploadOptions,
}

impl UploadOrchestrator {
    pub fn new(store: Storage, options: UploadOptions) -> Self {
        let transfer =
            RetryingTransfer::new(store.clone(), options.max_attempts, options.retry_delay);
        let wip = WipLock::new(store.clone());
        Self {
            store,
            transfer,
            wip,
            options,
        }
    }

    fn freshness_key(&self) -> &str {
        self.options
            .set_timestamp
            .as_ref()
            .map(|t| t.metadata_key.as_str())
            .unwrap_or(DEFAULT_METADATA_KEY)
    }

    /// Publish all pairs, strictly in input order.
    ///
    /// Precondition violations and integrity errors abort the whole run;
    /// transfer failures are recorded per element and reported back.
    pub async fn run(&self, pairs: &[FilePair]) -> Result<Vec<PairReport>> {
        validate_pairs(pairs, &self.options)?;

        let marker_files = describe_files(pairs);
        let mut reports = Vec::with_capacity(pairs.len());
        for pair in pairs {
            reports.push(self.process_pair(pair, &marker_files).await?);
        }

        let uploaded = reports
            .iter()
            .filter(|r| r.content_outcome == TransferOutcome::Uploaded)
            .count();
        info!(
            pairs = reports.len(),
            uploaded, "Finished processing file pairs"
        );
        Ok(reports)
    }

    #[instrument(skip(self, pair, marker_files), fields(content = %pair.content.remote))]
    async fn process_pair(
        &self,
        pair: &FilePair,
        marker_files: &[(String, String)],
    ) -> Result<PairReport> {
        // Exclusive intent over the destination comes first; a live marker
        // means another run owns this work item.
        if let Some(wip_options) = &self.options.wip {
            let marker = WipMarker::for_current_process(marker_files.to_vec());
            match self
                .wip
                .try_acquire(&pair.content.remote, wip_options.max_age_hours, &marker)
                .await?
            {
                AcquireOutcome::Acquired => {}
                AcquireOutcome::HeldByOther { age_hours, owner } => {
                    let owner_desc = owner
                        .as_ref()
                        .map(|o| o.owner_summary())
                        .unwrap_or_else(|| "unknown owner".to_string());
                    warn!(
                        age_hours,
                        "Destination {} is owned by another run ({}), skipping",
                        pair.content.remote,
                        owner_desc
                    );
                    let outcome = TransferOutcome::SkippedAlreadyExists;
                    return Ok(PairReport {
                        content: pair.content.clone(),
                        content_outcome: outcome,
                        log: pair.log.clone().map(|item| (item, outcome)),
                    });
                }
            }
        }

        // Collected before any truncation can happen below.
        let content_mtime = file_mtime(&pair.content.local)?;
        let content_outcome = self.transfer_content(&pair.content).await?;

        let log = match &pair.log {
            Some(item) => {
                let outcome = if content_outcome == TransferOutcome::Uploaded {
                    info!(
                        "Content uploaded, force-uploading companion log {} to {}",
                        item.local.display(),
                        item.remote
                    );
                    if self
                        .transfer
                        .upload_with_retry(&item.local, &item.remote)
                        .await?
                    {
                        TransferOutcome::Uploaded
                    } else {
                        TransferOutcome::Failed
                    }
                } else {
                    info!(
                        "Content was not uploaded ({}), skipping companion log {}",
                        content_outcome,
                        item.local.display()
                    );
                    content_outcome
                };
                Some((item.clone(), outcome))
            }
            None => None,
        };

        if content_outcome == TransferOutcome::Uploaded {
            if let Some(ts_options) = self.options.set_timestamp.clone() {
                self.stamp_freshness(&pair.content, content_mtime, &ts_options)
                    .await?;
                if let Some((log_item, TransferOutcome::Uploaded)) = &log {
                    let log_mtime = file_mtime(&log_item.local)?;
                    self.stamp_freshness(log_item, log_mtime, &ts_options)
                        .await?;
                }
            }

            if self.options.keep_timestamp_only
                && local_name(&pair.content.local).ends_with(".jsonl.bz2")
            {
                keep_timestamp_only(&pair.content.local, Some(content_mtime))?;
            }
        }

        if let Some(wip_options) = &self.options.wip {
            if wip_options.remove_after {
                self.wip.release(&pair.content.remote).await;
            }
        }

        Ok(PairReport {
            content: pair.content.clone(),
            content_outcome,
            log,
        })
    }

    async fn transfer_content(&self, item: &TransferItem) -> Result<TransferOutcome> {
        let local = local_state(&item.local)?;
        let remote = self.remote_state(&item.remote).await?;

        match decide_content(&local, remote.as_ref(), &self.options) {
            PlannedAction::Skip(outcome) => {
                info!("{}: {}", item.remote, outcome);
                Ok(outcome)
            }
            PlannedAction::Upload => {
                if self
                    .transfer
                    .upload_with_retry(&item.local, &item.remote)
                    .await?
                {
                    Ok(TransferOutcome::Uploaded)
                } else {
                    Ok(TransferOutcome::Failed)
                }
            }
        }
    }

    async fn remote_state(&self, remote: &ObjectRef) -> Result<Option<RemoteFileState>> {
        Ok(self.store.head(remote).await?.map(|info| RemoteFileState {
            freshness: info
                .metadata
                .get(self.freshness_key())
                .and_then(|v| NaiveDateTime::parse_from_str(v, TS_FORMAT).ok()),
            last_modified: info.last_modified,
        }))
    }

    /// Stamp freshness metadata on an uploaded object.
    ///
    /// Record-derived timestamps apply to JSONL content; everything else (and
    /// the `__file__` key) uses the local file's pre-collected mtime.
    /// Integrity violations abort the run; other stamping failures are logged
    /// and do not change the transfer outcome.
    async fn stamp_freshness(
        &self,
        item: &TransferItem,
        mtime: DateTime<Utc>,
        ts_options: &TimestampOptions,
    ) -> Result<()> {
        let name = local_name(&item.local);
        let is_jsonl =
            name.ends_with(".jsonl.bz2") || name.ends_with(".jsonl.gz") || name.ends_with(".jsonl");

        let spec = match ts_options.ts_key {
            TsKey::Ts if is_jsonl => TimestampSpec::FromRecords {
                ts_key: "ts".to_string(),
                scan_all_lines: false,
            },
            TsKey::Cdt if is_jsonl => TimestampSpec::FromRecords {
                ts_key: "cdt".to_string(),
                scan_all_lines: false,
            },
            _ => TimestampSpec::Explicit(mtime.format(TS_FORMAT).to_string()),
        };

        let updater = MetadataUpdater::new(self.store.clone(), &ts_options.metadata_key);
        match updater
            .update_metadata_if_needed(&item.remote, &spec, None, true)
            .await
        {
            Ok(MetadataOutcome::Updated { value }) => {
                info!(value = %value, "Set freshness metadata on {}", item.remote);
                Ok(())
            }
            Ok(MetadataOutcome::Skipped(reason)) => {
                info!(?reason, "Freshness metadata untouched on {}", item.remote);
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(error = %err, "Failed to set freshness metadata on {}", item.remote);
                Ok(())
            }
        }
    }
}

fn describe_files(pairs: &[FilePair]) -> Vec<(String, String)> {
    pairs
        .iter()
        .flat_map(|pair| std::iter::once(&pair.content).chain(pair.log.as_ref()))
        .map(|item| {
            (
                item.local.to_string_lossy().into_owned(),
                item.remote.to_string(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(local: &str, remote: &str) -> TransferItem {
        TransferItem {
            local: PathBuf::from(local),
            remote: ObjectRef::parse(remote).unwrap(),
        }
    }

    fn local(is_stamp: bool, mtime: &str) -> LocalFileState {
        LocalFileState {
            is_stamp,
            mtime: Utc
                .from_utc_datetime(&NaiveDateTime::parse_from_str(mtime, TS_FORMAT).unwrap()),
        }
    }

    fn remote(freshness: Option<&str>, last_modified: Option<&str>) -> RemoteFileState {
        RemoteFileState {
            freshness: freshness.map(|f| NaiveDateTime::parse_from_str(f, TS_FORMAT).unwrap()),
            last_modified: last_modified.map(|lm| {
                Utc.from_utc_datetime(&NaiveDateTime::parse_from_str(lm, TS_FORMAT).unwrap())
            }),
        }
    }

    #[test]
    fn test_is_data_file() {
        assert!(is_data_file("actionfem-1933.jsonl.bz2"));
        assert!(is_data_file("pages-1933.txt.gz"));
        assert!(!is_data_file("actionfem-1933.jsonl.bz2.log.gz"));
        assert!(!is_data_file("notes.txt"));
    }

    #[test]
    fn test_is_companion_log() {
        assert!(is_companion_log(
            "actionfem-1933.jsonl.bz2",
            "actionfem-1933.jsonl.bz2.log.gz"
        ));
        assert!(is_companion_log("a.jsonl.bz2", "a.jsonl.bz2.log"));
        // A different content file's log is not this file's companion.
        assert!(!is_companion_log("a.jsonl.bz2", "b.jsonl.bz2.log.gz"));
        // A data file never doubles as a log.
        assert!(!is_companion_log("a.jsonl.bz2", "a.jsonl.bz2"));
        assert!(!is_companion_log("a.jsonl.bz2", "a.jsonl.bz2.extra"));
    }

    #[test]
    fn test_pair_up_groups_logs_with_content() {
        let pairs = pair_up(vec![
            item("out/a.jsonl.bz2", "s3://b/a.jsonl.bz2"),
            item("out/a.jsonl.bz2.log.gz", "s3://b/a.jsonl.bz2.log.gz"),
            item("out/b.jsonl.bz2", "s3://b/b.jsonl.bz2"),
        ]);

        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].log.is_some());
        assert!(pairs[1].log.is_none());
    }

    #[test]
    fn test_pair_up_keeps_unrelated_items_separate() {
        let pairs = pair_up(vec![
            item("out/a.jsonl.bz2", "s3://b/a.jsonl.bz2"),
            item("out/b.jsonl.bz2", "s3://b/b.jsonl.bz2"),
            item("out/b.jsonl.bz2.log.gz", "s3://b/b.jsonl.bz2.log.gz"),
        ]);

        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].log.is_none());
        assert!(pairs[1].log.is_some());
    }

    #[test]
    fn test_decide_dest_absent_uploads() {
        let options = UploadOptions::default();
        let action = decide_content(
            &local(false, "2024-06-01T00:00:00Z"),
            None,
            &options,
        );
        assert_eq!(action, PlannedAction::Upload);
    }

    #[test]
    fn test_decide_dest_present_skips_without_upload_if_newer() {
        let options = UploadOptions::default();
        let action = decide_content(
            &local(false, "2024-06-01T00:00:00Z"),
            Some(&remote(None, Some("2024-01-01T00:00:00Z"))),
            &options,
        );
        assert_eq!(
            action,
            PlannedAction::Skip(TransferOutcome::SkippedAlreadyExists)
        );
    }

    #[test]
    fn test_decide_force_overwrites_existing() {
        let options = UploadOptions {
            force_overwrite: true,
            ..Default::default()
        };
        let action = decide_content(
            &local(false, "2024-06-01T00:00:00Z"),
            Some(&remote(Some("2024-12-01T00:00:00Z"), None)),
            &options,
        );
        assert_eq!(action, PlannedAction::Upload);
    }

    #[test]
    fn test_decide_newer_local_uploads() {
        let options = UploadOptions {
            upload_if_newer: true,
            ..Default::default()
        };
        let action = decide_content(
            &local(false, "2024-06-01T00:00:00Z"),
            Some(&remote(Some("2024-01-01T00:00:00Z"), None)),
            &options,
        );
        assert_eq!(action, PlannedAction::Upload);
    }

    #[test]
    fn test_decide_older_local_is_up_to_date() {
        let options = UploadOptions {
            upload_if_newer: true,
            ..Default::default()
        };
        let action = decide_content(
            &local(false, "2024-01-01T00:00:00Z"),
            Some(&remote(Some("2024-06-01T00:00:00Z"), None)),
            &options,
        );
        assert_eq!(
            action,
            PlannedAction::Skip(TransferOutcome::SkippedUpToDate)
        );
    }

    #[test]
    fn test_decide_falls_back_to_last_modified_without_freshness() {
        let options = UploadOptions {
            upload_if_newer: true,
            ..Default::default()
        };
        let action = decide_content(
            &local(false, "2024-06-01T00:00:00Z"),
            Some(&remote(None, Some("2024-01-01T00:00:00Z"))),
            &options,
        );
        assert_eq!(action, PlannedAction::Upload);
    }

    #[test]
    fn test_decide_stamp_skipped_even_under_force() {
        let options = UploadOptions {
            upload_if_newer: true,
            force_overwrite: true,
            ..Default::default()
        };
        let action = decide_content(
            &local(true, "2024-06-01T00:00:00Z"),
            Some(&remote(Some("2024-01-01T00:00:00Z"), None)),
            &options,
        );
        assert_eq!(
            action,
            PlannedAction::Skip(TransferOutcome::SkippedStampFile)
        );
    }

    #[test]
    fn test_decide_stamp_is_real_content_without_upload_if_newer() {
        // Without the upload-if-newer policy a 14-byte bz2 file is treated as
        // ordinary content (zero-length files are rejected by validation).
        let options = UploadOptions::default();
        let action = decide_content(&local(true, "2024-06-01T00:00:00Z"), None, &options);
        assert_eq!(action, PlannedAction::Upload);
    }

    #[test]
    fn test_ts_key_parsing() {
        assert_eq!("ts".parse::<TsKey>().unwrap(), TsKey::Ts);
        assert_eq!("cdt".parse::<TsKey>().unwrap(), TsKey::Cdt);
        assert_eq!("__file__".parse::<TsKey>().unwrap(), TsKey::FileModified);
        assert!("mtime".parse::<TsKey>().is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sneaky.jsonl.bz2.wip");
        std::fs::write(&path, b"x").unwrap();

        let pairs = vec![FilePair {
            content: TransferItem {
                local: path,
                remote: ObjectRef::parse("s3://b/sneaky.jsonl.bz2.wip").unwrap(),
            },
            log: None,
        }];
        let err = validate_pairs(&pairs, &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
    }

    #[test]
    fn test_validate_rejects_missing_local_file() {
        let pairs = vec![FilePair {
            content: item("/no/such/file.jsonl.bz2", "s3://b/file.jsonl.bz2"),
            log: None,
        }];
        let err = validate_pairs(&pairs, &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
    }

    #[test]
    fn test_validate_rejects_zero_byte_content_without_upload_if_newer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl.bz2");
        std::fs::write(&path, b"").unwrap();

        let pairs = vec![FilePair {
            content: TransferItem {
                local: path.clone(),
                remote: ObjectRef::parse("s3://b/empty.jsonl.bz2").unwrap(),
            },
            log: None,
        }];

        let err = validate_pairs(&pairs, &UploadOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));

        // Under upload-if-newer the same file is a stamp, not an error.
        let options = UploadOptions {
            upload_if_newer: true,
            ..Default::default()
        };
        assert!(validate_pairs(&pairs, &options).is_ok());
    }
}
