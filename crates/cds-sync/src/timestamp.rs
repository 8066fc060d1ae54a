//! Timestamp extraction from JSONL record streams
//!
//! Freshness metadata records the logical content time of a partition, taken
//! from the records themselves. Each record carries a timestamp under a known
//! field; the field determines the expected format via a fixed lookup table.
//! Chronologically prefixed files only need the first record; otherwise every
//! line is scanned and the maximum wins.

use crate::error::Result;
use cds_common::stamp::file_mtime;
use cds_common::CdsError;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Default custom-metadata key carrying the freshness timestamp.
pub const DEFAULT_METADATA_KEY: &str = "impresso-last-ts";

/// Canonical output format for freshness values (ISO-8601 UTC).
pub const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Known record fields and the one format each is written in.
const KNOWN_FORMATS: &[(&str, &str)] = &[
    ("ts", TS_FORMAT),
    ("cdt", "%Y-%m-%d %H:%M:%S"),
    ("timestamp", TS_FORMAT),
];

/// The format associated with a timestamp field, if the field is known.
pub fn known_format(ts_key: &str) -> Option<&'static str> {
    KNOWN_FORMATS
        .iter()
        .find(|(key, _)| *key == ts_key)
        .map(|(_, fmt)| *fmt)
}

/// Result of scanning a record stream.
#[derive(Debug, Clone)]
pub struct ExtractedTimestamp {
    /// Representative timestamp, formatted as [`TS_FORMAT`].
    pub value: String,
    /// Lines that failed JSON parsing, lacked the field, or carried an
    /// unparseable value.
    pub skipped_records: usize,
    /// True when no record yielded a timestamp and the file's own mtime was
    /// used instead (a degraded result, not an error).
    pub from_file_mtime: bool,
}

pub struct TimestampExtractor {
    ts_key: String,
    scan_all_lines: bool,
}

impl TimestampExtractor {
    /// Fails for fields not present in the format table.
    pub fn new(ts_key: &str, scan_all_lines: bool) -> Result<Self> {
        if known_format(ts_key).is_none() {
            return Err(CdsError::UnknownTimestampKey(ts_key.to_string()).into());
        }
        Ok(Self {
            ts_key: ts_key.to_string(),
            scan_all_lines,
        })
    }

    /// Extract the representative timestamp from a JSONL file.
    ///
    /// `.bz2` and `.gz` inputs are decompressed transparently.
    pub fn extract_from_file(&self, path: &Path) -> Result<ExtractedTimestamp> {
        let reader = open_record_stream(path)?;
        let (found, skipped_records) = self.scan(reader)?;

        match found {
            Some(ts) => {
                debug!(
                    skipped = skipped_records,
                    "Extracted timestamp {} from {}",
                    ts.format(TS_FORMAT),
                    path.display()
                );
                Ok(ExtractedTimestamp {
                    value: ts.format(TS_FORMAT).to_string(),
                    skipped_records,
                    from_file_mtime: false,
                })
            }
            None => {
                warn!(
                    "No valid timestamp found in {}; using file modification date",
                    path.display()
                );
                let mtime = file_mtime(path)?;
                Ok(ExtractedTimestamp {
                    value: mtime.format(TS_FORMAT).to_string(),
                    skipped_records,
                    from_file_mtime: true,
                })
            }
        }
    }

    fn scan<R: BufRead>(&self, reader: R) -> Result<(Option<NaiveDateTime>, usize)> {
        let mut latest: Option<NaiveDateTime> = None;
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            match self.parse_record(&line) {
                Some(ts) => {
                    if !self.scan_all_lines {
                        return Ok((Some(ts), skipped));
                    }
                    if latest.map(|cur| ts > cur).unwrap_or(true) {
                        latest = Some(ts);
                    }
                }
                None => skipped += 1,
            }
        }

        Ok((latest, skipped))
    }

    /// Parse one record line into a timestamp, or `None` for malformed input.
    fn parse_record(&self, line: &str) -> Option<NaiveDateTime> {
        let record: serde_json::Value = serde_json::from_str(line.trim()).ok()?;

        // Fall back through the alternate field names the corpus has used.
        let raw = record
            .get(&self.ts_key)
            .or_else(|| record.get("cdt"))
            .or_else(|| record.get("timestamp"))
            .and_then(|v| v.as_str())?;

        KNOWN_FORMATS
            .iter()
            .find_map(|(_, fmt)| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

/// Open a JSONL file, decompressing by extension.
fn open_record_stream(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let name = path.to_string_lossy();

    Ok(if name.ends_with(".bz2") {
        Box::new(BufReader::new(bzip2::read::BzDecoder::new(file)))
    } else if name.ends_with(".gz") {
        Box::new(BufReader::new(flate2::read::GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}
