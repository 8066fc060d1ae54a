//! CDS CLI library
//!
//! Command-line utilities for managing a corpus of compressed JSONL
//! partitions in an S3-compatible object store:
//!
//! - **Upload**: publish content/log file pairs with checksum verification,
//!   WIP coordination and freshness stamping (`cds upload`)
//! - **Existence checks**: make-friendly destination/WIP probing with
//!   distinct exit codes (`cds exists`)
//! - **Download**: checksum-verified retrieval (`cds download`)
//! - **Freshness metadata**: stamp stored JSONL files with their logical
//!   content time (`cds set-timestamp`)
//! - **Stamp mirroring**: mirror a prefix as local stamp files
//!   (`cds stamp`)
//! - **Listing**: enumerate objects under a prefix (`cds list`)

pub mod commands;
pub mod error;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CDS - Corpus Dataset Sync
#[derive(Parser, Debug)]
#[command(name = "cds")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write log output to a daily-rotating file in this directory
    #[arg(long, global = true, value_name = "DIR", env = "CDS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload local files to the store as content/log pairs
    Upload {
        /// Pairs of LOCAL_PATH S3_URI; must be an even number of arguments
        #[arg(value_name = "PATH", required = true)]
        files: Vec<String>,

        /// Overwrite destinations even if they already exist
        #[arg(long)]
        force_overwrite: bool,

        /// Only transfer when the local file is newer than the destination's
        /// freshness metadata
        #[arg(long)]
        upload_if_newer: bool,

        /// Truncate local *.jsonl.bz2 files after a verified upload, keeping
        /// only the timestamp
        #[arg(long)]
        keep_timestamp_only: bool,

        /// Stamp freshness metadata on uploaded objects
        #[arg(long)]
        set_timestamp: bool,

        /// Timestamp key to extract from JSONL records, or '__file__' to use
        /// the file modification date
        #[arg(long, default_value = "ts", value_parser = ["ts", "cdt", "__file__"])]
        ts_key: String,

        /// Metadata key for the freshness timestamp
        #[arg(long, default_value = cds_sync::DEFAULT_METADATA_KEY)]
        metadata_key: String,

        /// Coordinate with concurrent runs through WIP markers
        #[arg(long)]
        wip: bool,

        /// Maximum age in hours before a WIP marker counts as stale
        #[arg(long, default_value_t = 24.0, value_name = "HOURS")]
        wip_max_age: f64,

        /// Remove WIP markers after each pair is resolved
        #[arg(long)]
        remove_wip: bool,

        /// Attempts per transfer before giving up
        #[arg(long, default_value_t = 5)]
        max_attempts: u32,

        /// Seconds to sleep between attempts
        #[arg(long, default_value_t = 3, value_name = "SECONDS")]
        retry_delay: u64,
    },

    /// Check whether a destination exists, honoring WIP markers.
    ///
    /// Exit codes: 0 = destination exists; 1 = absent, proceed (WIP markers
    /// are created first when requested); 2 = a live WIP marker exists, skip.
    Exists {
        /// Destination to check
        #[arg(value_name = "S3_URI")]
        s3_uri: String,

        /// Also check for a WIP marker next to the destination
        #[arg(long)]
        wip: bool,

        /// Maximum age in hours before a WIP marker counts as stale
        #[arg(long, default_value_t = 24.0, value_name = "HOURS")]
        wip_max_age: f64,

        /// Create WIP markers for the given file pairs before exiting
        #[arg(long)]
        create_wip: bool,

        /// Pairs of LOCAL_PATH S3_URI the upcoming run will process
        #[arg(value_name = "PATH")]
        files: Vec<String>,
    },

    /// Download one object with checksum verification
    Download {
        #[arg(value_name = "S3_URI")]
        s3_uri: String,

        #[arg(value_name = "LOCAL_PATH")]
        local_path: PathBuf,

        /// Attempts before giving up
        #[arg(long, default_value_t = 5)]
        max_attempts: u32,

        /// Seconds to sleep between attempts
        #[arg(long, default_value_t = 3, value_name = "SECONDS")]
        retry_delay: u64,
    },

    /// Set freshness timestamp metadata on stored JSONL files
    SetTimestamp {
        /// Single file to process
        #[arg(long, value_name = "S3_URI", conflicts_with = "s3_prefix")]
        s3_file: Option<String>,

        /// Process every .jsonl/.jsonl.bz2/.jsonl.gz object under this prefix
        #[arg(long, value_name = "S3_URI")]
        s3_prefix: Option<String>,

        /// Metadata key to write
        #[arg(long, default_value = cds_sync::DEFAULT_METADATA_KEY)]
        metadata_key: String,

        /// Record field carrying the timestamp
        #[arg(long, default_value = "ts", value_parser = ["ts", "cdt"])]
        ts_key: String,

        /// Scan all lines for the latest timestamp instead of taking the first
        #[arg(long)]
        all_lines: bool,

        /// Optional destination for the rewritten object (single file only)
        #[arg(long, value_name = "S3_URI", conflicts_with = "s3_prefix")]
        output: Option<String>,

        /// Rewrite the metadata even when the key is already set
        #[arg(long)]
        force: bool,
    },

    /// Mirror an S3 prefix as local stamp files carrying the objects' mtimes
    Stamp {
        /// Prefix to mirror, e.g. s3://bucket/collection/
        #[arg(value_name = "S3_URI")]
        s3_prefix: String,

        /// Local directory the mirrored tree is rooted at
        #[arg(long, default_value = "./", value_name = "DIR")]
        local_dir: PathBuf,

        /// Do not include the bucket name in local paths
        #[arg(long)]
        no_bucket: bool,

        /// Extension appended to created stamp files (leading dot included)
        #[arg(long, default_value = ".stamp")]
        stamp_extension: String,

        /// Write object contents into the stamp files instead of leaving
        /// them empty
        #[arg(long)]
        write_content: bool,

        /// Aggregate per directory instead of per object: trim this many
        /// trailing path components and stamp each directory with the newest
        /// contained jsonl.bz2 timestamp
        #[arg(long, value_name = "N")]
        directory_level: Option<usize>,
    },

    /// List objects under a prefix
    List {
        /// Prefix to list, e.g. s3://bucket/collection/
        #[arg(value_name = "S3_URI")]
        s3_prefix: String,

        /// Glob filter applied to object keys
        #[arg(long)]
        glob: Option<String>,
    },
}
