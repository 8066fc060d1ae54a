//! `cds exists` command implementation
//!
//! Make-friendly probe of a destination and its WIP marker. The exit code is
//! the contract: `0` the destination exists, `1` it is absent and the caller
//! should proceed (after WIP markers were created, when requested), `2` a
//! live WIP marker exists and the caller should skip this work item.

use crate::commands::parse_file_pairs;
use crate::error::Result;
use cds_common::ObjectRef;
use cds_store::Storage;
use cds_sync::orchestrator::is_data_file;
use cds_sync::{WipLock, WipMarker, WipStatus};
use tracing::{debug, error, info};

/// Exit code: destination exists, nothing to do.
pub const EXIT_EXISTS: i32 = 0;
/// Exit code: destination absent, caller proceeds with produce-then-upload.
pub const EXIT_ABSENT: i32 = 1;
/// Exit code: another run owns this destination, caller skips it.
pub const EXIT_WIP_HELD: i32 = 2;

pub struct ExistsArgs {
    pub s3_uri: String,
    pub wip: bool,
    pub wip_max_age: f64,
    pub create_wip: bool,
    pub files: Vec<String>,
}

pub async fn run(storage: Storage, args: ExistsArgs) -> Result<i32> {
    let target = ObjectRef::parse(&args.s3_uri)?;

    // Probe errors are treated as "not existing": the caller re-produces the
    // file, which is always safe, while a hard failure here would wedge
    // make-style pipelines on transient store hiccups.
    match storage.head(&target).await {
        Ok(Some(_)) => {
            info!("Destination exists: {}", target);
            return Ok(EXIT_EXISTS);
        }
        Ok(None) => {}
        Err(err) => {
            debug!(error = %err, "Error checking destination existence; treating as absent");
        }
    }

    let lock = WipLock::new(storage.clone());

    if args.wip {
        match lock.status(&target, args.wip_max_age).await? {
            WipStatus::Live { age_hours, owner } => {
                if let Some(owner) = owner {
                    info!(
                        age_hours,
                        "Destination is being produced by {}",
                        owner.owner_summary()
                    );
                }
                return Ok(EXIT_WIP_HELD);
            }
            WipStatus::StaleRemoved { age_hours } => {
                info!(
                    age_hours,
                    "Reclaimed stale WIP marker for {}", target
                );
            }
            WipStatus::Absent => {}
        }
    }

    if args.create_wip && !args.files.is_empty() {
        let items = parse_file_pairs(&args.files)?;
        let described: Vec<(String, String)> = items
            .iter()
            .map(|item| {
                (
                    item.local.to_string_lossy().into_owned(),
                    item.remote.to_string(),
                )
            })
            .collect();
        let marker = WipMarker::for_current_process(described);

        // Markers guard data files only; companion logs follow their content
        // sibling and never get their own marker.
        for item in &items {
            let name = item.local.to_string_lossy();
            if !is_data_file(&name) {
                continue;
            }
            if let Err(err) = lock.create_marker(&item.remote, &marker).await {
                error!(error = %err, "Failed to create WIP marker for {}", item.remote);
            }
        }
    }

    info!("Destination does not exist: {}", target);
    Ok(EXIT_ABSENT)
}
