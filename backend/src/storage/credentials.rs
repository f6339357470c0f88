use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client as HttpClient;
use serde::Deserialize;

pub const DEFAULT_METADATA_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/attributes/";
pub const DEFAULT_CREDENTIALS_KEY: &str = "GOOGLE_APPLICATION_CREDENTIALS_BASE64";

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Metadata service answered {0}")]
    Status(reqwest::StatusCode),
    #[error("Credential blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Credential blob is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Credential blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// HMAC interoperability key for the object store.
#[derive(Clone, Deserialize)]
pub struct HmacKey {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish()
    }
}

/// Whether startup may continue without storage credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    Required,
    Optional,
}

/// Credentials loaded once at startup.
#[derive(Debug, Clone)]
pub enum StorageCredentials {
    Available(HmacKey),
    Unavailable { reason: String },
}

impl StorageCredentials {
    /// Fetches the credential blob; with [`CredentialPolicy::Optional`] a
    /// failure is logged and recorded instead of returned.
    pub async fn load(
        metadata: &MetadataClient,
        key: &str,
        policy: CredentialPolicy,
    ) -> Result<Self, CredentialsError> {
        match metadata.load_credentials(key).await {
            Ok(hmac) => {
                log::info!("Loaded storage credentials for key id {}", hmac.access_key_id);
                Ok(Self::Available(hmac))
            }
            Err(e) if policy == CredentialPolicy::Optional => {
                log::error!("Error fetching metadata: {}", e);
                Ok(Self::Unavailable {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Decodes the base64 JSON credential blob stored as an instance attribute.
pub fn parse_credentials(blob: &str) -> Result<HmacKey, CredentialsError> {
    let raw = STANDARD.decode(blob.trim())?;
    let json = String::from_utf8(raw)?;
    Ok(serde_json::from_str(&json)?)
}

#[derive(Clone)]
pub struct MetadataClient {
    http_client: HttpClient,
    base_url: String,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_attribute(&self, key: &str) -> Result<String, CredentialsError> {
        let url = format!("{}{}", self.base_url, key);
        let response = self
            .http_client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(CredentialsError::Status(response.status()));
        }
        Ok(response.text().await?)
    }

    pub async fn load_credentials(&self, key: &str) -> Result<HmacKey, CredentialsError> {
        let blob = self.fetch_attribute(key).await?;
        parse_credentials(&blob)
    }
}
