use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{
        Builder as S3ConfigBuilder, IdentityCache, Region, retry::RetryConfig,
        timeout::TimeoutConfig,
    },
    presigning::PresigningConfig,
};
use events::storage::{FileUrlSigner, StorageError, StorageObject};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub endpoint: String,
    pub region: String,
    pub signed_url_expiry_secs: u64,
}

/// Signs read URLs against any S3-compatible endpoint, including GCS interoperability mode.
#[derive(Clone)]
pub struct S3UrlSigner {
    client: Client,
    expiry: Duration,
}

impl S3UrlSigner {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            config.secret_access_key.expose_secret(),
            None,
            None,
            "gateway-static",
        );

        let s3_config = S3ConfigBuilder::new()
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .stalled_stream_protection(aws_sdk_s3::config::StalledStreamProtectionConfig::disabled())
            .identity_cache(IdentityCache::no_cache())
            // No sleep impl is configured, so retries and timeouts must stay off.
            .retry_config(RetryConfig::disabled())
            .timeout_config(TimeoutConfig::disabled())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            expiry: Duration::from_secs(config.signed_url_expiry_secs),
        }
    }
}

#[async_trait]
impl FileUrlSigner for S3UrlSigner {
    async fn signed_read_url(&self, object: &StorageObject) -> Result<String, StorageError> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(self.expiry)
            .build()
            .map_err(|e| StorageError::PresignConfig(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
