use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend client could not be built (bad region, missing credentials).
    #[error("{0}")]
    Config(String),

    /// The write itself failed.
    #[error("{0}")]
    Upload(String),
}

/// Object store scoped to a single region.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Writes `body` under `key` in `bucket` with private access.
    async fn put_private_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;
}

/// Produces pre-authenticated storage clients for a location hint.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn client_for_region(
        &self,
        region: &str,
    ) -> Result<Arc<dyn StorageService>, StorageError>;
}

pub struct S3StorageService {
    client: Client,
}

impl S3StorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_private_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
