use crate::metrics;
use crate::services::storage::{StorageError, StorageProvider};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// A single object write, assembled by the upload handler.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub size: usize,
    pub elapsed: Duration,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unable to load AWS configuration for region {region}: {source}")]
    Config {
        region: String,
        #[source]
        source: StorageError,
    },

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("Upload failed: storage backend did not respond within {0:?}")]
    Timeout(Duration),
}

/// Writes uploaded files to the storage backend, one attempt per request.
pub struct Uploader {
    provider: Arc<dyn StorageProvider>,
    timeout: Option<Duration>,
    record_metrics: bool,
}

impl Uploader {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            provider,
            timeout: None,
            record_metrics: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        for (field, value) in [
            ("bucket name", &request.bucket),
            ("object key", &request.key),
            ("region", &request.region),
        ] {
            if value.is_empty() {
                return Err(UploadError::InvalidRequest(format!("{field} must not be empty")));
            }
        }

        let result = self.write(&request).await;

        match &result {
            Ok(outcome) => {
                info!(
                    bucket = %outcome.bucket,
                    key = %outcome.key,
                    region = %outcome.region,
                    size = outcome.size,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Upload completed"
                );
                if self.record_metrics {
                    metrics::record_upload(&outcome.bucket, &outcome.region, outcome.elapsed);
                }
            }
            Err(e) => {
                error!(
                    bucket = %request.bucket,
                    key = %request.key,
                    region = %request.region,
                    "Upload failed: {}",
                    e
                );
                if self.record_metrics {
                    metrics::record_upload_failure(&request.bucket, &request.region);
                }
            }
        }

        result
    }

    async fn write(&self, request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
        let storage = self
            .provider
            .client_for_region(&request.region)
            .await
            .map_err(|source| UploadError::Config {
                region: request.region.clone(),
                source,
            })?;

        let start = Instant::now();
        let put = storage.put_private_object(
            &request.bucket,
            &request.key,
            request.body.clone(),
            request.content_type.as_deref(),
        );

        let written = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, put)
                .await
                .map_err(|_| UploadError::Timeout(limit))?,
            None => put.await,
        };
        written.map_err(UploadError::Upload)?;

        Ok(UploadOutcome {
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            region: request.region.clone(),
            size: request.body.len(),
            elapsed: start.elapsed(),
        })
    }
}
