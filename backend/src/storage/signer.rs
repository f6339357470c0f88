use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;

use super::credentials::HmacKey;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_STORAGE_REGION: &str = "auto";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid presign expiry: {0}")]
    Expiry(String),
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Produces time-limited read URLs for private objects.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn signed_get_url(
        &self,
        bucket: &str,
        object: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

/// Presigns GET requests against an S3-compatible endpoint.
#[derive(Clone)]
pub struct ObjectStorageService {
    client: Client,
}

impl ObjectStorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The key's own endpoint and region win over the configured defaults.
    pub async fn from_credentials(key: &HmacKey, endpoint: &str, region: &str) -> Self {
        let endpoint = key.endpoint.clone().unwrap_or_else(|| endpoint.to_string());
        let region = key.region.clone().unwrap_or_else(|| region.to_string());
        let credentials = Credentials::new(
            key.access_key_id.clone(),
            key.secret_access_key.clone(),
            None,
            None,
            "instance-metadata",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self::new(Client::from_conf(s3_config))
    }
}

#[async_trait]
impl UrlSigner for ObjectStorageService {
    async fn signed_get_url(
        &self,
        bucket: &str,
        object: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Expiry(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(object)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}
