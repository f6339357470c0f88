use std::sync::Arc;

use crate::annotation::{BrushTarget, LabelMap, LabelMapError};
use crate::backends::{ClothingBackend, MlBackend, SamBackend};
use crate::config::{AppConfig, BackendKind};
use crate::predictor::{HfSegformer, RemoteSamPredictor};
use crate::storage::{
    CredentialPolicy, CredentialsError, ImageLoader, ImageResolver, MetadataClient, Signing,
    StorageCredentials,
};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Storage credentials are required: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("Label map: {0}")]
    LabelMap(#[from] LabelMapError),
}

impl BackendKind {
    /// Interactive labeling cannot sign cloud images without credentials, so it
    /// refuses to start; batch labeling may still serve public images.
    pub fn credential_policy(self) -> CredentialPolicy {
        match self {
            BackendKind::Sam => CredentialPolicy::Required,
            BackendKind::Clothing => CredentialPolicy::Optional,
        }
    }
}

async fn image_resolver(config: &AppConfig) -> Result<ImageResolver, StartupError> {
    let metadata = MetadataClient::new(config.metadata_url.clone());
    let credentials = StorageCredentials::load(
        &metadata,
        &config.credentials_key,
        config.backend.credential_policy(),
    )
    .await?;
    let signing =
        Signing::from_credentials(credentials, &config.storage_endpoint, &config.storage_region)
            .await;
    Ok(ImageResolver::new(signing))
}

fn label_map(config: &AppConfig) -> Result<LabelMap, StartupError> {
    match &config.label_map_path {
        Some(path) => {
            log::info!("Loading label map from {}", path.display());
            Ok(LabelMap::load(path)?)
        }
        None => Ok(LabelMap::default()),
    }
}

/// Builds the backend selected by `ML_BACKEND`.
pub async fn build_backend(config: &AppConfig) -> Result<Arc<dyn MlBackend>, StartupError> {
    let target = BrushTarget::new(&config.from_name, &config.to_name, &config.value_key);
    let loader = ImageLoader::new(config.files.clone());

    let backend: Arc<dyn MlBackend> = match config.backend {
        BackendKind::Sam => {
            let predictor =
                RemoteSamPredictor::new(config.sam_predictor_url.clone(), config.sam_choice);
            log::info!("Using {} at {}", config.sam_choice, config.sam_predictor_url);
            Arc::new(SamBackend::new(
                Arc::new(predictor),
                image_resolver(config).await?,
                loader,
                target,
            ))
        }
        BackendKind::Clothing => {
            let labels = label_map(config)?;
            let segmenter = HfSegformer::new(
                config.hf_endpoint.clone(),
                &config.hf_model,
                config.hf_token.clone(),
            );
            log::info!("Using {} at {}", config.hf_model, config.hf_endpoint);
            Arc::new(ClothingBackend::new(
                Arc::new(segmenter),
                image_resolver(config).await?,
                loader,
                labels,
                target,
            ))
        }
    };

    Ok(backend)
}
