//! Object store URIs
//!
//! Every remote location is addressed as `s3://bucket/key`. [`ObjectRef`] is
//! the parsed, validated form; it is immutable once constructed.

use crate::error::CdsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference to exactly one object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    bucket: String,
    key: String,
}

impl ObjectRef {
    /// Build a reference from already-split parts.
    ///
    /// Fails if either part is empty.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, CdsError> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() || key.is_empty() {
            return Err(CdsError::InvalidUri(format!(
                "bucket and key must be non-empty (bucket: {:?}, key: {:?})",
                bucket, key
            )));
        }
        Ok(Self { bucket, key })
    }

    /// Parse an `s3://bucket/key` URI.
    pub fn parse(uri: &str) -> Result<Self, CdsError> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| CdsError::InvalidUri(format!("URI must start with s3://: {uri}")))?;
        let (bucket, key) = rest.split_once('/').ok_or_else(|| {
            CdsError::InvalidUri(format!("URI must include both bucket and key: {uri}"))
        })?;
        Self::new(bucket, key)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Derive a sibling reference by appending a suffix to the key.
    ///
    /// The synchronization protocol names its helper objects this way:
    /// `<key>.wip`, `<key>.tmp`, `<key>.backup`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            bucket: self.bucket.clone(),
            key: format!("{}{}", self.key, suffix),
        }
    }

    /// File name component of the key (text after the last `/`).
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl FromStr for ObjectRef {
    type Err = CdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_uri() {
        let r = ObjectRef::parse("s3://mybucket/myfolder/myfile.txt").unwrap();
        assert_eq!(r.bucket(), "mybucket");
        assert_eq!(r.key(), "myfolder/myfile.txt");
    }

    #[test]
    fn test_parse_prefix_uri_keeps_trailing_slash() {
        let r = ObjectRef::parse("s3://mybucket/myfolder/subfolder/").unwrap();
        assert_eq!(r.key(), "myfolder/subfolder/");
    }

    #[test]
    fn test_rejects_missing_scheme() {
        assert!(matches!(
            ObjectRef::parse("not-an-s3-path"),
            Err(CdsError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_rejects_bucket_only() {
        assert!(ObjectRef::parse("s3://mybucket").is_err());
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(ObjectRef::parse("s3://mybucket/").is_err());
    }

    #[test]
    fn test_roundtrip_display() {
        let uri = "s3://bucket/a/b/c.jsonl.bz2";
        assert_eq!(ObjectRef::parse(uri).unwrap().to_string(), uri);
    }

    #[test]
    fn test_with_suffix() {
        let r = ObjectRef::parse("s3://b/data/file.jsonl.bz2").unwrap();
        let wip = r.with_suffix(".wip");
        assert_eq!(wip.to_string(), "s3://b/data/file.jsonl.bz2.wip");
        assert_eq!(r.key(), "data/file.jsonl.bz2");
    }

    #[test]
    fn test_file_name() {
        let r = ObjectRef::parse("s3://b/data/file.jsonl.bz2").unwrap();
        assert_eq!(r.file_name(), "file.jsonl.bz2");
    }
}
