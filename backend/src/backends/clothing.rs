use std::sync::Arc;

use async_trait::async_trait;
use shared::{InteractionContext, Prediction, Task};

use super::{BackendError, MlBackend};
use crate::annotation::{AlphanumericId, BrushTarget, LabelMap, UniqueIds, semantic_prediction};
use crate::predictor::{PredictorError, SemanticSegmenter};
use crate::storage::{ImageLoader, ImageResolver};

/// Whole-image clothing segmentation, one brush region per garment class.
pub struct ClothingBackend {
    segmenter: Arc<dyn SemanticSegmenter>,
    resolver: ImageResolver,
    loader: ImageLoader,
    labels: LabelMap,
    /// Used when the request carries no labeling config.
    default_target: BrushTarget,
}

impl ClothingBackend {
    pub fn new(
        segmenter: Arc<dyn SemanticSegmenter>,
        resolver: ImageResolver,
        loader: ImageLoader,
        labels: LabelMap,
        default_target: BrushTarget,
    ) -> Self {
        Self {
            segmenter,
            resolver,
            loader,
            labels,
            default_target,
        }
    }
}

#[async_trait]
impl MlBackend for ClothingBackend {
    fn model_class(&self) -> &str {
        "ClothingBackend"
    }

    fn model_version(&self) -> &str {
        self.segmenter.model_name()
    }

    async fn predict(
        &self,
        tasks: &[Task],
        _context: Option<&InteractionContext>,
        label_config: Option<&str>,
    ) -> Result<Vec<Prediction>, BackendError> {
        let target = self.default_target.for_config(label_config)?;
        let task = tasks.first().ok_or(BackendError::NoTasks)?;
        let location = self.resolver.resolve(task, &target.value_key).await?;
        let image = self.loader.load(&location).await?;
        log::info!(
            "Segmenting {}x{} image with {}",
            image.width(),
            image.height(),
            self.segmenter.model_name()
        );

        let class_map = self.segmenter.segment(&image).await?;
        let expected = (image.height() as usize, image.width() as usize);
        if class_map.dim() != expected {
            return Err(PredictorError::Shape(format!(
                "class map is {:?}, image is {:?}",
                class_map.dim(),
                expected
            ))
            .into());
        }

        Ok(semantic_prediction(
            class_map.view(),
            &self.labels,
            &target.region,
            &mut UniqueIds::new(AlphanumericId::default()),
        )?)
    }
}
