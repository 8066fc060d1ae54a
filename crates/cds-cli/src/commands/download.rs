//! `cds download` command implementation
//!
//! Checksum-verified retrieval of a single object.

use crate::error::{CliError, Result};
use cds_common::ObjectRef;
use cds_store::Storage;
use cds_sync::RetryingTransfer;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

pub async fn run(
    storage: Storage,
    s3_uri: String,
    local_path: PathBuf,
    max_attempts: u32,
    retry_delay: u64,
) -> Result<()> {
    let source = ObjectRef::parse(&s3_uri)?;

    if let Some(parent) = local_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let transfer = RetryingTransfer::new(storage, max_attempts, Duration::from_secs(retry_delay));
    if transfer.download_with_retry(&source, &local_path).await? {
        println!(
            "{} {} downloaded to {}",
            "✓".green(),
            source,
            local_path.display()
        );
        Ok(())
    } else {
        Err(CliError::transfer_failed(source.to_string()))
    }
}
