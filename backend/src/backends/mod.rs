pub mod clothing;
pub mod sam;

use async_trait::async_trait;
use shared::{InteractionContext, Prediction, Task};

use crate::annotation::{LabelConfigError, PromptError, RleError};
use crate::predictor::PredictorError;
use crate::storage::{LoadError, ResolveError};

pub use clothing::ClothingBackend;
pub use sam::SamBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request contains no tasks")]
    NoTasks,
    #[error("{0}")]
    LabelConfig(#[from] LabelConfigError),
    #[error("Invalid interaction context: {0}")]
    Prompt(#[from] PromptError),
    #[error("Image resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Image load failed: {0}")]
    Load(#[from] LoadError),
    #[error("Prediction failed: {0}")]
    Predictor(#[from] PredictorError),
    #[error("Mask encoding failed: {0}")]
    Encoding(#[from] RleError),
}

impl BackendError {
    /// True when the request itself is malformed.
    pub fn is_client_error(&self) -> bool {
        match self {
            BackendError::NoTasks | BackendError::LabelConfig(_) | BackendError::Prompt(_) => true,
            BackendError::Resolve(e) => e.is_client_error(),
            _ => false,
        }
    }
}

/// A Label Studio ML backend.
#[async_trait]
pub trait MlBackend: Send + Sync {
    fn model_class(&self) -> &str;

    fn model_version(&self) -> &str;

    /// `label_config` is the project's labeling config when known; it decides
    /// which control the results are attached to.
    async fn predict(
        &self,
        tasks: &[Task],
        context: Option<&InteractionContext>,
        label_config: Option<&str>,
    ) -> Result<Vec<Prediction>, BackendError>;
}
