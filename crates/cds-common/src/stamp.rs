//! Stamp files
//!
//! A stamp file is a content-free placeholder meaning "processing occurred but
//! the output was empty". Pipelines leave them behind so that make-style
//! dependency checks see an up-to-date target without carrying real payload.
//! Stamps are never uploaded as content, even under a force flag.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::info;

/// Size of an empty bz2 stream. A `.bz2` file of exactly this many bytes
/// holds a valid compressed stream with zero uncompressed payload.
pub const EMPTY_BZ2_LEN: u64 = 14;

/// Classify a local file as a stamp by its size and name.
///
/// A file is a stamp if it is zero bytes, or exactly [`EMPTY_BZ2_LEN`] bytes
/// while carrying the `.bz2` extension (an empty compressed stream).
pub fn is_stamp_file(path: &Path, len: u64) -> bool {
    if len == 0 {
        return true;
    }
    len == EMPTY_BZ2_LEN
        && path
            .extension()
            .map(|ext| ext == "bz2")
            .unwrap_or(false)
}

/// Read a file's modification time as a UTC timestamp.
pub fn file_mtime(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Truncate a file to zero length, keeping only its timestamp.
///
/// The file's mtime is set to `timestamp` (or now when absent) so the logical
/// content time survives the truncation. Used after a verified upload to free
/// local space while keeping make-style freshness checks working.
pub fn keep_timestamp_only(path: &Path, timestamp: Option<DateTime<Utc>>) -> Result<()> {
    let file: File = OpenOptions::new().write(true).truncate(true).open(path)?;
    let timestamp = timestamp.unwrap_or_else(Utc::now);
    file.set_modified(timestamp.into())?;
    file.sync_all()?;

    info!(
        path = %path.display(),
        timestamp = %timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        "Truncated local file, keeping only its timestamp"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zero_byte_file_is_a_stamp() {
        assert!(is_stamp_file(Path::new("x.jsonl.bz2"), 0));
        assert!(is_stamp_file(Path::new("plain.txt"), 0));
    }

    #[test]
    fn test_empty_bz2_stream_is_a_stamp() {
        assert!(is_stamp_file(Path::new("x.bz2"), EMPTY_BZ2_LEN));
        assert!(is_stamp_file(Path::new("x.jsonl.bz2"), EMPTY_BZ2_LEN));
    }

    #[test]
    fn test_fourteen_bytes_without_bz2_extension_is_not_a_stamp() {
        assert!(!is_stamp_file(Path::new("x.txt"), EMPTY_BZ2_LEN));
        assert!(!is_stamp_file(Path::new("x.jsonl.gz"), EMPTY_BZ2_LEN));
    }

    #[test]
    fn test_real_content_is_not_a_stamp() {
        assert!(!is_stamp_file(Path::new("x.bz2"), 15));
        assert!(!is_stamp_file(Path::new("x.jsonl.bz2"), 4096));
    }

    #[test]
    fn test_keep_timestamp_only_truncates_and_sets_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl.bz2");
        std::fs::write(&path, b"some payload bytes").unwrap();

        let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        keep_timestamp_only(&path, Some(ts)).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), 0);
        assert_eq!(file_mtime(&path).unwrap(), ts);
    }
}
