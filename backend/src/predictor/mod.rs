//! External segmentation models.
//!
//! The backends only see these traits; the HTTP clients in this module are the
//! production implementations and tests substitute in-memory fakes.

pub mod mask;
pub mod sam;
pub mod segformer;

use async_trait::async_trait;
use image::RgbImage;
use ndarray::Array2;

use crate::annotation::ScoredMask;

pub use sam::{RemoteSamPredictor, SamChoice};
pub use segformer::{CLOTHES_CLASSES, HfSegformer};

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model service answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Mask is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Unexpected model output shape: {0}")]
    Shape(String),
}

/// How the image reaches a remote model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// A URL the model service can fetch itself.
    Url(String),
    /// Encoded image bytes, for files only this backend can read.
    Bytes(Vec<u8>),
}

/// Prompted segmentation (SAM family).
#[async_trait]
pub trait InteractivePredictor: Send + Sync {
    fn model_name(&self) -> &str;

    /// Masks are returned at `width x height`, one per candidate, with scores.
    async fn predict(
        &self,
        image: &ImageInput,
        width: u32,
        height: u32,
        point_coords: Option<&[[i32; 2]]>,
        point_labels: Option<&[u8]>,
        input_box: Option<[i32; 4]>,
    ) -> Result<Vec<ScoredMask>, PredictorError>;
}

/// Per-pixel classification into a fixed class list.
#[async_trait]
pub trait SemanticSegmenter: Send + Sync {
    fn model_name(&self) -> &str;

    /// Returns a class id per pixel, same size as `image`.
    async fn segment(&self, image: &RgbImage) -> Result<Array2<u8>, PredictorError>;
}
