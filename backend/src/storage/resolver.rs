use std::sync::Arc;
use std::time::Duration;

use shared::Task;

use super::credentials::StorageCredentials;
use super::signer::{ObjectStorageService, UrlSigner};

pub const CLOUD_SCHEME: &str = "gs://";
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Task has no image reference under '{0}'")]
    MissingImage(String),
    #[error("Cloud reference '{0}' has no object path")]
    MalformedReference(String),
    #[error("Cannot sign '{reference}': storage credentials unavailable ({reason})")]
    CredentialsUnavailable { reference: String, reason: String },
}

impl ResolveError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ResolveError::CredentialsUnavailable { .. })
    }
}

pub enum Signing {
    Ready(Arc<dyn UrlSigner>),
    Unavailable { reason: String },
}

impl Signing {
    pub async fn from_credentials(
        credentials: StorageCredentials,
        endpoint: &str,
        region: &str,
    ) -> Self {
        match credentials {
            StorageCredentials::Available(key) => {
                let service = ObjectStorageService::from_credentials(&key, endpoint, region).await;
                Signing::Ready(Arc::new(service))
            }
            StorageCredentials::Unavailable { reason } => Signing::Unavailable { reason },
        }
    }
}

/// Splits `gs://bucket/path/to/object` into bucket and object path.
pub fn split_cloud_uri(reference: &str) -> Option<Result<(&str, &str), ResolveError>> {
    let rest = reference.strip_prefix(CLOUD_SCHEME)?;
    Some(
        rest.split_once('/')
            .ok_or_else(|| ResolveError::MalformedReference(reference.to_string())),
    )
}

pub struct ImageResolver {
    signing: Signing,
}

impl ImageResolver {
    pub fn new(signing: Signing) -> Self {
        Self { signing }
    }

    pub fn image_reference<'a>(task: &'a Task, field: &str) -> Result<&'a str, ResolveError> {
        task.data_value(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ResolveError::MissingImage(field.to_string()))
    }

    /// Returns a fetchable location for the task's image.
    ///
    /// Cloud references are signed for one hour; when signing fails the
    /// reference is returned unsigned and the later fetch reports the error.
    pub async fn resolve(&self, task: &Task, field: &str) -> Result<String, ResolveError> {
        let reference = Self::image_reference(task, field)?;
        let Some(parts) = split_cloud_uri(reference) else {
            return Ok(reference.to_string());
        };
        let (bucket, object) = parts?;

        let signer = match &self.signing {
            Signing::Ready(signer) => signer,
            Signing::Unavailable { reason } => {
                return Err(ResolveError::CredentialsUnavailable {
                    reference: reference.to_string(),
                    reason: reason.clone(),
                });
            }
        };

        match signer.signed_get_url(bucket, object, SIGNED_URL_TTL).await {
            Ok(url) => Ok(url),
            Err(e) => {
                log::warn!("Can't generate signed URL for {}. Reason: {}", reference, e);
                Ok(reference.to_string())
            }
        }
    }
}
