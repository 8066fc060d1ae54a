//! Command implementations

pub mod download;
pub mod exists;
pub mod list;
pub mod set_timestamp;
pub mod stamp;
pub mod upload;

use crate::error::{CliError, Result};
use cds_common::ObjectRef;
use cds_sync::TransferItem;
use std::path::PathBuf;

/// Turn a flat `LOCAL S3_URI LOCAL S3_URI ...` argument list into items.
///
/// Fails for an odd argument count or a malformed URI, before anything
/// touches the store.
pub(crate) fn parse_file_pairs(files: &[String]) -> Result<Vec<TransferItem>> {
    if files.is_empty() {
        return Err(CliError::config("no file pairs provided"));
    }
    if files.len() % 2 != 0 {
        return Err(CliError::config(format!(
            "arguments must be pairs of LOCAL_PATH S3_URI; got {} arguments",
            files.len()
        )));
    }

    files
        .chunks(2)
        .map(|chunk| {
            Ok(TransferItem {
                local: PathBuf::from(&chunk[0]),
                remote: ObjectRef::parse(&chunk[1])?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_file_pairs() {
        let items = parse_file_pairs(&args(&[
            "out/a.jsonl.bz2",
            "s3://bucket/a.jsonl.bz2",
            "out/a.jsonl.bz2.log.gz",
            "s3://bucket/a.jsonl.bz2.log.gz",
        ]))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].remote.to_string(), "s3://bucket/a.jsonl.bz2");
    }

    #[test]
    fn test_odd_argument_count_is_rejected() {
        let err = parse_file_pairs(&args(&["a", "s3://b/k", "c"])).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_empty_arguments_are_rejected() {
        assert!(parse_file_pairs(&[]).is_err());
    }

    #[test]
    fn test_bad_uri_is_rejected() {
        let err = parse_file_pairs(&args(&["a", "not-a-uri"])).unwrap_err();
        assert!(matches!(err, CliError::Common(_)));
    }
}
