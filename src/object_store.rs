//! Object store reads (S3)
//!
//! Fetches one JSON document by bucket and key. Failures come back as
//! `NotFound`, `Access`, `Parse` (or `Transient`/`Auth` for transport and
//! credential problems); a failed read never yields a placeholder value.

use crate::aws_errors::from_sdk_error;
use crate::error::{CostdashError, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info};

/// Raw byte access to a bucket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// S3 backed `ObjectStore`
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: S3Client::new(aws_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let location = format!("s3://{}/{}", bucket, key);
        info!("Reading {}", location);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| from_sdk_error("GetObject", &location, e))?;

        let data = response.body.collect().await.map_err(|e| CostdashError::Transient {
            operation: "GetObject".to_string(),
            message: format!("Failed to read response body of {}: {}", location, e),
        })?;

        let bytes = data.into_bytes().to_vec();
        debug!("Read {} bytes from {}", bytes.len(), location);
        Ok(bytes)
    }
}

/// Fetch and parse one JSON object.
///
/// Bucket and key are trimmed; either being empty afterwards is a
/// `Validation` error raised before any request is made.
pub async fn fetch_json<S>(store: &S, bucket: &str, key: &str) -> Result<serde_json::Value>
where
    S: ObjectStore + ?Sized,
{
    let bucket = bucket.trim();
    let key = key.trim();
    if bucket.is_empty() {
        return Err(CostdashError::validation("bucket", "bucket name is empty"));
    }
    if key.is_empty() {
        return Err(CostdashError::validation("key", "object key is empty"));
    }

    let bytes = store.get_object(bucket, key).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CostdashError::parse(format!("s3://{}/{}", bucket, key), e))
}
