use std::sync::Arc;

use async_trait::async_trait;
use shared::{InteractionContext, Prediction, Task};

use super::{BackendError, MlBackend};
use crate::annotation::{
    BrushTarget, UniqueIds, UuidFragment, context_size, extract_prompts, interactive_prediction,
};
use crate::predictor::{ImageInput, InteractivePredictor};
use crate::storage::{ImageLoader, ImageResolver, is_remote};

/// Interactive segmentation: the user's clicks and boxes prompt a SAM model.
pub struct SamBackend {
    predictor: Arc<dyn InteractivePredictor>,
    resolver: ImageResolver,
    loader: ImageLoader,
    /// Used when the request carries no labeling config.
    default_target: BrushTarget,
}

impl SamBackend {
    pub fn new(
        predictor: Arc<dyn InteractivePredictor>,
        resolver: ImageResolver,
        loader: ImageLoader,
        default_target: BrushTarget,
    ) -> Self {
        Self {
            predictor,
            resolver,
            loader,
            default_target,
        }
    }

    /// URLs go to the model service as-is; Label Studio and local files are
    /// read here and sent as bytes.
    async fn image_input(&self, location: String) -> Result<ImageInput, BackendError> {
        if is_remote(&location) {
            return Ok(ImageInput::Url(location));
        }
        log::debug!("Reading {} for {}", location, self.predictor.model_name());
        Ok(ImageInput::Bytes(self.loader.fetch(&location).await?))
    }
}

#[async_trait]
impl MlBackend for SamBackend {
    fn model_class(&self) -> &str {
        "SamBackend"
    }

    fn model_version(&self) -> &str {
        self.predictor.model_name()
    }

    async fn predict(
        &self,
        tasks: &[Task],
        context: Option<&InteractionContext>,
        label_config: Option<&str>,
    ) -> Result<Vec<Prediction>, BackendError> {
        // Nothing to segment until the user has interacted with the image.
        let Some(context) = context.filter(|c| !c.result.is_empty()) else {
            return Ok(Vec::new());
        };
        let Some((width, height)) = context_size(context) else {
            return Ok(Vec::new());
        };

        let prompts = extract_prompts(&context.result, width, height)?;
        log::info!(
            "Point coords are {:?}, point labels are {:?}, input box is {:?}",
            prompts.point_coords,
            prompts.point_labels,
            prompts.input_box
        );

        let target = self.default_target.for_config(label_config)?;
        let task = tasks.first().ok_or(BackendError::NoTasks)?;
        let location = self.resolver.resolve(task, &target.value_key).await?;
        let image = self.image_input(location).await?;

        let masks = self
            .predictor
            .predict(
                &image,
                width,
                height,
                prompts.point_coords(),
                prompts.point_labels(),
                prompts.input_box,
            )
            .await?;
        log::debug!("{} returned {} masks", self.predictor.model_name(), masks.len());

        let label = prompts.selected_label.as_deref().unwrap_or_default();
        Ok(interactive_prediction(
            &masks,
            width,
            height,
            &target.region,
            label,
            self.predictor.model_name(),
            &mut UniqueIds::new(UuidFragment),
        )?)
    }
}
