//! `cds stamp` command implementation
//!
//! Mirrors the object tree under a prefix as local stamp files whose mtime
//! equals the object's LastModified, so make-style pipelines can check
//! remote freshness without downloading anything. A directory-level mode
//! aggregates instead: one stamp per directory, carrying the newest
//! contained `jsonl.bz2` timestamp.

use crate::error::Result;
use cds_common::ObjectRef;
use cds_store::{ObjectSummary, Storage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct StampArgs {
    pub s3_prefix: String,
    pub local_dir: PathBuf,
    pub no_bucket: bool,
    pub stamp_extension: String,
    pub write_content: bool,
    pub directory_level: Option<usize>,
}

pub async fn run(storage: Storage, args: StampArgs) -> Result<()> {
    let prefix = ObjectRef::parse(&args.s3_prefix)?;
    let objects = storage.list(prefix.bucket(), prefix.key()).await?;
    if objects.is_empty() {
        warn!("No objects found for prefix {}", prefix);
        return Ok(());
    }

    let created = match args.directory_level {
        Some(level) => stamp_directories(&args, prefix.bucket(), &objects, level)?,
        None => stamp_objects(&storage, &args, prefix.bucket(), &objects).await?,
    };

    info!("Stamp file creation completed. Files created: {}", created);
    Ok(())
}

/// One stamp per object, mirroring the key hierarchy.
async fn stamp_objects(
    storage: &Storage,
    args: &StampArgs,
    bucket: &str,
    objects: &[ObjectSummary],
) -> Result<usize> {
    let mut created = 0usize;

    for summary in objects {
        // Directory placeholders only need their local counterpart.
        if summary.key.ends_with('/') {
            let dir = local_path(args, bucket, &summary.key, "");
            std::fs::create_dir_all(&dir)?;
            continue;
        }

        let (content, extension) = if args.write_content {
            let object = ObjectRef::new(bucket, &summary.key)?;
            (fetch_content(storage, &object).await?, "")
        } else {
            (Vec::new(), args.stamp_extension.as_str())
        };

        let path = local_path(args, bucket, &summary.key, extension);
        write_stamp(&path, &content, summary.last_modified)?;
        created += 1;
        info!(
            "'{}' created. Last modification: {:?}",
            path.display(),
            summary.last_modified
        );
    }

    Ok(created)
}

/// One stamp per directory, trimming `level` trailing path components and
/// keeping the newest `jsonl.bz2` LastModified per directory.
fn stamp_directories(
    args: &StampArgs,
    bucket: &str,
    objects: &[ObjectSummary],
    level: usize,
) -> Result<usize> {
    let mut dir_to_latest: HashMap<String, DateTime<Utc>> = HashMap::new();

    for summary in objects {
        if !summary.key.ends_with("jsonl.bz2") {
            continue;
        }
        let parts: Vec<&str> = summary.key.split('/').collect();
        if parts.len() <= level {
            warn!(
                "Skipping '{}': not enough directory levels for --directory-level {}",
                summary.key, level
            );
            continue;
        }
        let directory = parts[..parts.len() - level].join("/");

        let Some(last_modified) = summary.last_modified else {
            continue;
        };
        dir_to_latest
            .entry(directory)
            .and_modify(|latest| {
                if last_modified > *latest {
                    *latest = last_modified;
                }
            })
            .or_insert(last_modified);
    }

    let mut created = 0usize;
    for (directory, latest) in &dir_to_latest {
        let path = local_path(args, bucket, directory, &args.stamp_extension);
        write_stamp(&path, &[], Some(*latest))?;
        created += 1;
        info!(
            "Created stamp file '{}' with timestamp {}",
            path.display(),
            latest.to_rfc3339()
        );
    }

    Ok(created)
}

fn local_path(args: &StampArgs, bucket: &str, key: &str, extension: &str) -> PathBuf {
    let mut path = args.local_dir.clone();
    if !args.no_bucket {
        path = path.join(bucket);
    }
    for part in key.split('/').filter(|p| !p.is_empty()) {
        path = path.join(part);
    }
    if !extension.is_empty() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.set_file_name(format!("{name}{extension}"));
    }
    path
}

fn write_stamp(path: &Path, content: &[u8], mtime: Option<DateTime<Utc>>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    if let Some(ts) = mtime {
        let file = std::fs::OpenOptions::new().write(true).open(path)?;
        file.set_modified(ts.into())?;
    }
    Ok(())
}

/// Fetch an object body, decompressing `.bz2` keys.
async fn fetch_content(storage: &Storage, object: &ObjectRef) -> Result<Vec<u8>> {
    let raw = storage.get_bytes(object).await?;
    if object.key().ends_with(".bz2") {
        let mut decoded = Vec::new();
        bzip2::read::BzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
        Ok(decoded)
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(local_dir: &Path, no_bucket: bool) -> StampArgs {
        StampArgs {
            s3_prefix: "s3://corpus/collection/".to_string(),
            local_dir: local_dir.to_path_buf(),
            no_bucket,
            stamp_extension: ".stamp".to_string(),
            write_content: false,
            directory_level: None,
        }
    }

    #[test]
    fn test_local_path_includes_bucket_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_path(
            &args(dir.path(), false),
            "corpus",
            "collection/1933/part-0.jsonl.bz2",
            ".stamp",
        );
        assert_eq!(
            path,
            dir.path()
                .join("corpus/collection/1933/part-0.jsonl.bz2.stamp")
        );
    }

    #[test]
    fn test_local_path_without_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = local_path(
            &args(dir.path(), true),
            "corpus",
            "collection/part-0.jsonl.bz2",
            "",
        );
        assert_eq!(path, dir.path().join("collection/part-0.jsonl.bz2"));
    }

    #[test]
    fn test_write_stamp_sets_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/part.stamp");
        let ts = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 2, 2, 0, 0, 0).unwrap();

        write_stamp(&path, b"", Some(ts)).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(cds_common::stamp::file_mtime(&path).unwrap(), ts);
    }

    #[test]
    fn test_directory_grouping() {
        let dir = tempfile::tempdir().unwrap();
        let t1 = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 0, 0, 0).unwrap();
        let objects = vec![
            ObjectSummary {
                key: "collection/1933/part-0.jsonl.bz2".to_string(),
                size: 10,
                last_modified: Some(t1),
            },
            ObjectSummary {
                key: "collection/1933/part-1.jsonl.bz2".to_string(),
                size: 10,
                last_modified: Some(t2),
            },
            // Ignored: wrong extension.
            ObjectSummary {
                key: "collection/1933/readme.txt".to_string(),
                size: 10,
                last_modified: Some(t2),
            },
        ];

        let created = stamp_directories(&args(dir.path(), true), "corpus", &objects, 1).unwrap();
        assert_eq!(created, 1);

        // The directory stamp carries the newest contained timestamp.
        let stamp = dir.path().join("collection/1933.stamp");
        assert_eq!(cds_common::stamp::file_mtime(&stamp).unwrap(), t2);
    }
}
