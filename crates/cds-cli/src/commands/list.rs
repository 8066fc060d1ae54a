//! `cds list` command implementation
//!
//! Prints `s3://bucket/key` lines for every object under a prefix, with an
//! optional glob filter on the key.

use crate::error::{CliError, Result};
use cds_common::ObjectRef;
use cds_store::Storage;

pub async fn run(storage: Storage, s3_prefix: String, glob: Option<String>) -> Result<()> {
    let prefix = ObjectRef::parse(&s3_prefix)?;
    let pattern = glob
        .map(|g| glob::Pattern::new(&g))
        .transpose()
        .map_err(|e| CliError::config(format!("invalid glob pattern: {e}")))?;

    for summary in storage.list(prefix.bucket(), prefix.key()).await? {
        if let Some(ref pattern) = pattern {
            if !pattern.matches(&summary.key) {
                continue;
            }
        }
        println!("s3://{}/{}", prefix.bucket(), summary.key);
    }

    Ok(())
}
