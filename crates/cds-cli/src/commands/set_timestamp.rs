//! `cds set-timestamp` command implementation
//!
//! Stamps stored JSONL files with the logical timestamp of their content,
//! either one file at a time or for every JSONL object under a prefix.

use crate::error::{CliError, Result};
use cds_common::ObjectRef;
use cds_store::Storage;
use cds_sync::{MetadataOutcome, MetadataUpdater, SyncError, TimestampSpec};
use tracing::{info, warn};

/// Extensions the batch mode considers JSONL partitions.
const JSONL_EXTENSIONS: &[&str] = &[".jsonl", ".jsonl.bz2", ".jsonl.gz"];

pub struct SetTimestampArgs {
    pub s3_file: Option<String>,
    pub s3_prefix: Option<String>,
    pub metadata_key: String,
    pub ts_key: String,
    pub all_lines: bool,
    pub output: Option<String>,
    pub force: bool,
}

pub async fn run(storage: Storage, args: SetTimestampArgs) -> Result<()> {
    let updater = MetadataUpdater::new(storage.clone(), &args.metadata_key);
    let spec = TimestampSpec::FromRecords {
        ts_key: args.ts_key.clone(),
        scan_all_lines: args.all_lines,
    };

    match (&args.s3_file, &args.s3_prefix) {
        (Some(uri), None) => {
            let object = ObjectRef::parse(uri)?;
            let output = args
                .output
                .as_deref()
                .map(ObjectRef::parse)
                .transpose()?;

            match updater
                .update_metadata_if_needed(&object, &spec, output.as_ref(), args.force)
                .await?
            {
                MetadataOutcome::Updated { value } => {
                    info!(value = %value, "Updated metadata for {}", object);
                }
                MetadataOutcome::Skipped(_) => {
                    info!("File skipped: {}", object);
                }
            }
            Ok(())
        }
        (None, Some(prefix_uri)) => run_for_prefix(&storage, &updater, &spec, prefix_uri, args.force).await,
        _ => Err(CliError::config(
            "exactly one of --s3-file or --s3-prefix is required",
        )),
    }
}

async fn run_for_prefix(
    storage: &Storage,
    updater: &MetadataUpdater,
    spec: &TimestampSpec,
    prefix_uri: &str,
    force: bool,
) -> Result<()> {
    let prefix = ObjectRef::parse(prefix_uri)?;

    let mut processed = 0usize;
    let mut skipped = 0usize;

    for summary in storage.list(prefix.bucket(), prefix.key()).await? {
        if !JSONL_EXTENSIONS.iter().any(|ext| summary.key.ends_with(ext)) {
            continue;
        }

        let object = ObjectRef::new(prefix.bucket(), &summary.key)?;
        info!("Processing file: {}", object);

        match updater
            .update_metadata_if_needed(&object, spec, None, force)
            .await
        {
            Ok(MetadataOutcome::Updated { .. }) => processed += 1,
            Ok(MetadataOutcome::Skipped(_)) => {
                info!("File skipped: {}", summary.key);
                skipped += 1;
            }
            // Integrity violations mean the store misbehaved; never plow on.
            Err(err @ SyncError::Integrity(_)) => return Err(err.into()),
            Err(err) => {
                warn!(error = %err, "Skipping file due to error: {}", summary.key);
                skipped += 1;
            }
        }
    }

    info!("Overall statistics:");
    info!("Total files: {}", processed + skipped);
    info!("Skipped files: {}", skipped);
    info!("Processed files: {}", processed);
    Ok(())
}
