use crate::config::StorageConfig;
use crate::services::storage::{S3StorageService, StorageError, StorageProvider, StorageService};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds region-scoped S3 clients from the ambient AWS configuration loaded at startup.
pub struct S3StorageProvider {
    base: SdkConfig,
    force_path_style: bool,
}

impl S3StorageProvider {
    pub fn new(base: SdkConfig, force_path_style: bool) -> Self {
        Self {
            base,
            force_path_style,
        }
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    async fn client_for_region(
        &self,
        region: &str,
    ) -> Result<Arc<dyn StorageService>, StorageError> {
        validate_region(region)?;

        if self.base.credentials_provider().is_none() {
            return Err(StorageError::Config(
                "no AWS credentials provider is configured".to_string(),
            ));
        }

        let s3_config = aws_sdk_s3::config::Builder::from(&self.base)
            .region(Region::new(region.to_string()))
            .force_path_style(self.force_path_style)
            .build();

        debug!(region, "Built S3 client");
        Ok(Arc::new(S3StorageService::new(
            aws_sdk_s3::Client::from_conf(s3_config),
        )))
    }
}

fn validate_region(region: &str) -> Result<(), StorageError> {
    let valid = !region.is_empty()
        && region.len() <= 64
        && region
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StorageError::Config(format!("invalid region name {region:?}")))
    }
}

pub async fn setup_storage(config: &StorageConfig) -> Arc<S3StorageProvider> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(endpoint_url) = &config.endpoint_url {
        info!("☁️  S3 endpoint override: {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let sdk_config = loader.load().await;
    info!(
        "☁️  S3 Storage ready (path style: {})",
        config.force_path_style
    );

    Arc::new(S3StorageProvider::new(sdk_config, config.force_path_style))
}
