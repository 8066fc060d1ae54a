//! CDS CLI - Main entry point
#![recursion_limit = "512"]

use cds_cli::commands::{
    self,
    exists::ExistsArgs,
    set_timestamp::SetTimestampArgs,
    stamp::StampArgs,
    upload::UploadArgs,
};
use cds_cli::{Cli, Commands};
use cds_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use cds_store::{Storage, StoreConfig};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Pick up .env credentials before anything reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging from CLI flags, letting the environment override.
    let mut builder = LogConfig::builder().level(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });
    if let Some(ref dir) = cli.log_dir {
        builder = builder.output(LogOutput::Both).log_dir(dir);
    }
    let log_config = builder
        .log_file_prefix("cds")
        .build()
        .apply_env()
        .unwrap_or_default();
    let _ = init_logging(&log_config);

    // Interrupts must cooperate with critical store operations.
    cds_sync::critical::install_interrupt_handler();

    let exit_code = match execute_command(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            1
        }
    };
    process::exit(exit_code);
}

/// Execute the CLI command, returning the process exit code.
async fn execute_command(cli: Cli) -> cds_cli::Result<i32> {
    let storage = Storage::new(StoreConfig::from_env()?)?;

    match cli.command {
        Commands::Upload {
            files,
            force_overwrite,
            upload_if_newer,
            keep_timestamp_only,
            set_timestamp,
            ts_key,
            metadata_key,
            wip,
            wip_max_age,
            remove_wip,
            max_attempts,
            retry_delay,
        } => {
            commands::upload::run(
                storage,
                UploadArgs {
                    files,
                    force_overwrite,
                    upload_if_newer,
                    keep_timestamp_only,
                    set_timestamp,
                    ts_key,
                    metadata_key,
                    wip,
                    wip_max_age,
                    remove_wip,
                    max_attempts,
                    retry_delay,
                },
            )
            .await?;
            Ok(0)
        }

        Commands::Exists {
            s3_uri,
            wip,
            wip_max_age,
            create_wip,
            files,
        } => {
            commands::exists::run(
                storage,
                ExistsArgs {
                    s3_uri,
                    wip,
                    wip_max_age,
                    create_wip,
                    files,
                },
            )
            .await
        }

        Commands::Download {
            s3_uri,
            local_path,
            max_attempts,
            retry_delay,
        } => {
            commands::download::run(storage, s3_uri, local_path, max_attempts, retry_delay)
                .await?;
            Ok(0)
        }

        Commands::SetTimestamp {
            s3_file,
            s3_prefix,
            metadata_key,
            ts_key,
            all_lines,
            output,
            force,
        } => {
            commands::set_timestamp::run(
                storage,
                SetTimestampArgs {
                    s3_file,
                    s3_prefix,
                    metadata_key,
                    ts_key,
                    all_lines,
                    output,
                    force,
                },
            )
            .await?;
            Ok(0)
        }

        Commands::Stamp {
            s3_prefix,
            local_dir,
            no_bucket,
            stamp_extension,
            write_content,
            directory_level,
        } => {
            commands::stamp::run(
                storage,
                StampArgs {
                    s3_prefix,
                    local_dir,
                    no_bucket,
                    stamp_extension,
                    write_content,
                    directory_level,
                },
            )
            .await?;
            Ok(0)
        }

        Commands::List { s3_prefix, glob } => {
            commands::list::run(storage, s3_prefix, glob).await?;
            Ok(0)
        }
    }
}
