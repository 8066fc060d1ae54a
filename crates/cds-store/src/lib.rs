//! S3-compatible object store client for CDS
//!
//! Thin wrapper over the AWS SDK exposing exactly the primitives the
//! synchronization core needs: HEAD (existence + metadata), GET, PUT,
//! server-side COPY (optionally replacing custom metadata), DELETE, and
//! paginated prefix listing. Buckets are addressed per call through
//! [`ObjectRef`], since one invocation may touch several buckets.
//!
//! Read-after-write on a single key is assumed strongly consistent; prefix
//! listings are assumed only eventually consistent. Nothing in this crate
//! retries; retry policy belongs to the synchronization layer.

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    types::MetadataDirective,
    Client,
};
use cds_common::checksum::StreamingChecksum;
use cds_common::ObjectRef;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

pub mod config;

pub use config::StoreConfig;

/// Metadata of a stored object, as returned by HEAD.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub size: i64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Custom (user-defined) metadata map.
    pub metadata: HashMap<String, String>,
}

/// One entry of a prefix listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

impl Storage {
    pub fn new(config: StoreConfig) -> Result<Self> {
        debug!(region = %config.region, endpoint = ?config.endpoint, "Initializing store client");

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "cds-store",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Store client initialized");
        Ok(Self { client })
    }

    /// HEAD an object; `Ok(None)` when it does not exist.
    #[instrument(skip(self))]
    pub async fn head(&self, object: &ObjectRef) -> Result<Option<ObjectInfo>> {
        match self
            .client
            .head_object()
            .bucket(object.bucket())
            .key(object.key())
            .send()
            .await
        {
            Ok(response) => Ok(Some(ObjectInfo {
                size: response.content_length().unwrap_or(0),
                etag: response.e_tag().map(|s| s.to_string()),
                content_type: response.content_type().map(|s| s.to_string()),
                last_modified: response.last_modified().and_then(to_chrono),
                metadata: response.metadata().cloned().unwrap_or_default(),
            })),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(None)
                } else {
                    Err(anyhow!("Failed to HEAD {}: {}", object, err))
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn exists(&self, object: &ObjectRef) -> Result<bool> {
        Ok(self.head(object).await?.is_some())
    }

    #[instrument(skip(self, data))]
    pub async fn put_bytes(
        &self,
        object: &ObjectRef,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        debug!(size = data.len(), "Uploading bytes to {}", object);

        let mut request = self
            .client
            .put_object()
            .bucket(object.bucket())
            .key(object.key())
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to upload to {object}"))?;

        debug!("Uploaded {}", object);
        Ok(())
    }

    /// PUT a local file, streaming it from disk.
    #[instrument(skip(self))]
    pub async fn upload_file(&self, object: &ObjectRef, local_path: &Path) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        self.client
            .put_object()
            .bucket(object.bucket())
            .key(object.key())
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to {object}", local_path.display()))?;

        debug!(path = %local_path.display(), "Uploaded file to {}", object);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_bytes(&self, object: &ObjectRef) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(object.bucket())
            .key(object.key())
            .send()
            .await
            .with_context(|| format!("Failed to download {object}"))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read object body")?
            .into_bytes()
            .to_vec();

        debug!(size = data.len(), "Downloaded {}", object);
        Ok(data)
    }

    /// GET an object into a local file, streaming chunk by chunk.
    #[instrument(skip(self))]
    pub async fn download_to_file(&self, object: &ObjectRef, local_path: &Path) -> Result<()> {
        let response = self
            .client
            .get_object()
            .bucket(object.bucket())
            .key(object.key())
            .send()
            .await
            .with_context(|| format!("Failed to download {object}"))?;

        let mut file = tokio::fs::File::create(local_path)
            .await
            .with_context(|| format!("Failed to create {}", local_path.display()))?;

        let mut body = response.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .context("Failed to read object body")?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(path = %local_path.display(), "Downloaded {} to file", object);
        Ok(())
    }

    /// Digest of a remote object's bytes, computed by streaming the body.
    ///
    /// The store-reported ETag is never used for this: its semantics vary by
    /// store and by multipart upload state.
    #[instrument(skip(self))]
    pub async fn checksum(&self, object: &ObjectRef) -> Result<String> {
        let response = self
            .client
            .get_object()
            .bucket(object.bucket())
            .key(object.key())
            .send()
            .await
            .with_context(|| format!("Failed to stream {object} for checksum"))?;

        let mut checksum = StreamingChecksum::new();
        let mut body = response.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .context("Failed to read object body")?
        {
            checksum.update(&chunk);
        }

        Ok(checksum.finish())
    }

    /// Server-side copy, keeping the source's metadata.
    #[instrument(skip(self))]
    pub async fn copy(&self, source: &ObjectRef, dest: &ObjectRef) -> Result<()> {
        let copy_source = format!("{}/{}", source.bucket(), source.key());

        self.client
            .copy_object()
            .bucket(dest.bucket())
            .key(dest.key())
            .copy_source(&copy_source)
            .send()
            .await
            .with_context(|| format!("Failed to copy {source} to {dest}"))?;

        debug!("Copied {} to {}", source, dest);
        Ok(())
    }

    /// Server-side copy that replaces the destination's custom metadata.
    ///
    /// With source == dest this is the store's atomic "rewrite metadata,
    /// keep bytes" primitive; it never inherits the source's metadata map.
    #[instrument(skip(self, metadata))]
    pub async fn copy_replace_metadata(
        &self,
        source: &ObjectRef,
        dest: &ObjectRef,
        metadata: HashMap<String, String>,
        content_type: Option<String>,
    ) -> Result<()> {
        let copy_source = format!("{}/{}", source.bucket(), source.key());

        let mut request = self
            .client
            .copy_object()
            .bucket(dest.bucket())
            .key(dest.key())
            .copy_source(&copy_source)
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(metadata));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to copy {source} to {dest} with new metadata"))?;

        debug!("Copied {} to {} replacing metadata", source, dest);
        Ok(())
    }

    /// DELETE an object. Deleting a key that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, object: &ObjectRef) -> Result<()> {
        self.client
            .delete_object()
            .bucket(object.bucket())
            .key(object.key())
            .send()
            .await
            .with_context(|| format!("Failed to delete {object}"))?;

        debug!("Deleted {}", object);
        Ok(())
    }

    /// List all objects under a prefix, following continuation tokens.
    #[instrument(skip(self))]
    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        debug!("Listing objects in s3://{}/{}", bucket, prefix);

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut summaries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.context("Failed to list objects")?;
            for obj in page.contents() {
                let Some(key) = obj.key() else { continue };
                summaries.push(ObjectSummary {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0),
                    last_modified: obj.last_modified().and_then(to_chrono),
                });
            }
        }

        debug!(count = summaries.len(), "Listed objects");
        Ok(summaries)
    }

    /// Create a bucket if it does not already exist.
    ///
    /// Mostly useful against MinIO in tests and bootstrap scripts.
    #[instrument(skip(self))]
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(err) => {
                let already_there = err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists())
                    .unwrap_or(false);
                if already_there {
                    debug!("Bucket {} already exists", bucket);
                    Ok(())
                } else {
                    warn!(error = %err, "Failed to create bucket {}", bucket);
                    Err(anyhow!("Failed to create bucket {}: {}", bucket, err))
                }
            }
        }
    }
}
