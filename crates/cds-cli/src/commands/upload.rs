//! `cds upload` command implementation
//!
//! Publishes content/log file pairs with checksum verification, optional WIP
//! coordination and freshness stamping.

use crate::commands::parse_file_pairs;
use crate::error::{CliError, Result};
use cds_store::Storage;
use cds_sync::orchestrator::{TimestampOptions, WipOptions};
use cds_sync::{pair_up, TransferOutcome, UploadOptions, UploadOrchestrator};
use colored::Colorize;
use std::time::Duration;
use tracing::info;

pub struct UploadArgs {
    pub files: Vec<String>,
    pub force_overwrite: bool,
    pub upload_if_newer: bool,
    pub keep_timestamp_only: bool,
    pub set_timestamp: bool,
    pub ts_key: String,
    pub metadata_key: String,
    pub wip: bool,
    pub wip_max_age: f64,
    pub remove_wip: bool,
    pub max_attempts: u32,
    pub retry_delay: u64,
}

pub async fn run(storage: Storage, args: UploadArgs) -> Result<()> {
    let items = parse_file_pairs(&args.files)?;
    let pairs = pair_up(items);
    info!("Uploading {} file pair(s)", pairs.len());

    let options = UploadOptions {
        force_overwrite: args.force_overwrite,
        upload_if_newer: args.upload_if_newer,
        keep_timestamp_only: args.keep_timestamp_only,
        set_timestamp: if args.set_timestamp {
            Some(TimestampOptions {
                ts_key: args.ts_key.parse()?,
                metadata_key: args.metadata_key,
            })
        } else {
            None
        },
        wip: if args.wip {
            Some(WipOptions {
                max_age_hours: args.wip_max_age,
                remove_after: args.remove_wip,
            })
        } else {
            None
        },
        max_attempts: args.max_attempts,
        retry_delay: Duration::from_secs(args.retry_delay),
    };

    let orchestrator = UploadOrchestrator::new(storage, options);
    let reports = orchestrator.run(&pairs).await?;

    let mut failed = Vec::new();
    for report in &reports {
        print_outcome(&report.content.remote.to_string(), report.content_outcome);
        if report.content_outcome == TransferOutcome::Failed {
            failed.push(report.content.remote.to_string());
        }
        if let Some((log_item, log_outcome)) = &report.log {
            print_outcome(&log_item.remote.to_string(), *log_outcome);
            if *log_outcome == TransferOutcome::Failed {
                failed.push(log_item.remote.to_string());
            }
        }
    }

    if failed.is_empty() {
        println!("\n{} All file pairs processed", "✓".green().bold());
        Ok(())
    } else {
        Err(CliError::transfer_failed(failed.join(", ")))
    }
}

fn print_outcome(destination: &str, outcome: TransferOutcome) {
    match outcome {
        TransferOutcome::Uploaded => println!("{} {} uploaded", "✓".green(), destination),
        TransferOutcome::Failed => println!("{} {} failed", "✗".red(), destination),
        skip => println!("{} {} {}", "-".dimmed(), destination, skip),
    }
}
