use std::io::Cursor;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use ndarray::{Array2, Zip};
use reqwest::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use url::Url;

use super::mask::decode_png_mask;
use super::{PredictorError, SemanticSegmenter};

pub const DEFAULT_HF_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_HF_MODEL: &str = "mattmdjaga/segformer_b2_clothes";

/// `id2label` of `mattmdjaga/segformer_b2_clothes`.
pub const CLOTHES_CLASSES: [&str; 18] = [
    "Background",
    "Hat",
    "Hair",
    "Sunglasses",
    "Upper-clothes",
    "Skirt",
    "Pants",
    "Dress",
    "Belt",
    "Left-shoe",
    "Right-shoe",
    "Face",
    "Left-leg",
    "Right-leg",
    "Left-arm",
    "Right-arm",
    "Bag",
    "Scarf",
];

#[derive(Debug, Deserialize)]
struct Segment {
    label: String,
    /// base64 PNG, white where the pixel belongs to `label`
    mask: String,
}

pub fn class_id(label: &str) -> Option<u8> {
    CLOTHES_CLASSES
        .iter()
        .position(|c| c.eq_ignore_ascii_case(label))
        .map(|i| i as u8)
}

/// Client for the hosted image-segmentation inference API.
#[derive(Clone)]
pub struct HfSegformer {
    http_client: HttpClient,
    endpoint: Url,
    model: String,
    token: Option<String>,
}

impl HfSegformer {
    pub fn new(endpoint: Url, model: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
            model: model.into(),
            token,
        }
    }

    fn model_url(&self) -> String {
        format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), self.model)
    }
}

/// Paints each segment's mask with its class id; pixels no segment claims stay background.
fn class_map_from_segments(
    segments: &[Segment],
    width: u32,
    height: u32,
) -> Result<Array2<u8>, PredictorError> {
    let mut class_map = Array2::<u8>::zeros((height as usize, width as usize));
    for segment in segments {
        let Some(class) = class_id(&segment.label) else {
            log::warn!("Ignoring unknown segmentation label '{}'", segment.label);
            continue;
        };
        let mask = decode_png_mask(&segment.mask, width, height)?;
        Zip::from(&mut class_map).and(&mask).for_each(|c, &m| {
            if m > 0 {
                *c = class;
            }
        });
    }
    Ok(class_map)
}

#[async_trait]
impl SemanticSegmenter for HfSegformer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn segment(&self, image: &RgbImage) -> Result<Array2<u8>, PredictorError> {
        let mut body = Cursor::new(Vec::new());
        image.write_to(&mut body, ImageFormat::Png)?;

        let mut request = self
            .http_client
            .post(self.model_url())
            .header(CONTENT_TYPE, "image/png")
            .body(body.into_inner());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Status { status, body });
        }

        let segments: Vec<Segment> = response.json().await?;
        log::debug!("{} returned {} segments", self.model, segments.len());
        class_map_from_segments(&segments, image.width(), image.height())
    }
}
