use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use super::mask::decode_png_mask;
use super::{ImageInput, InteractivePredictor, PredictorError};
use crate::annotation::ScoredMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
pub enum SamChoice {
    #[default]
    #[strum(serialize = "MobileSAM")]
    MobileSam,
    #[strum(serialize = "SAM")]
    Sam,
}

#[derive(Serialize)]
struct SamRequest<'a> {
    model: &'a str,
    img_path: Option<&'a str>,
    /// base64 image bytes, sent instead of `img_path`
    #[serde(skip_serializing_if = "Option::is_none")]
    img_base64: Option<String>,
    point_coords: Option<&'a [[i32; 2]]>,
    point_labels: Option<&'a [u8]>,
    input_box: Option<[i32; 4]>,
}

#[derive(Deserialize)]
struct SamResponse {
    /// base64 PNG per candidate mask
    masks: Vec<String>,
    probs: Vec<f32>,
}

/// Client for a SAM / MobileSAM inference service.
#[derive(Clone)]
pub struct RemoteSamPredictor {
    http_client: HttpClient,
    endpoint: Url,
    choice: SamChoice,
}

impl RemoteSamPredictor {
    pub fn new(endpoint: Url, choice: SamChoice) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
            choice,
        }
    }
}

#[async_trait]
impl InteractivePredictor for RemoteSamPredictor {
    fn model_name(&self) -> &str {
        self.choice.as_ref()
    }

    async fn predict(
        &self,
        image: &ImageInput,
        width: u32,
        height: u32,
        point_coords: Option<&[[i32; 2]]>,
        point_labels: Option<&[u8]>,
        input_box: Option<[i32; 4]>,
    ) -> Result<Vec<ScoredMask>, PredictorError> {
        let (img_path, img_base64) = match image {
            ImageInput::Url(url) => (Some(url.as_str()), None),
            ImageInput::Bytes(bytes) => (None, Some(STANDARD.encode(bytes))),
        };
        let request = SamRequest {
            model: self.choice.as_ref(),
            img_path,
            img_base64,
            point_coords,
            point_labels,
            input_box,
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::Status { status, body });
        }

        let output: SamResponse = response.json().await?;
        if output.masks.len() != output.probs.len() {
            log::warn!(
                "{} returned {} masks but {} scores",
                self.choice,
                output.masks.len(),
                output.probs.len()
            );
        }

        output
            .masks
            .iter()
            .zip(output.probs)
            .map(|(mask, prob)| {
                Ok(ScoredMask {
                    mask: decode_png_mask(mask, width, height)?,
                    score: Some(prob),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_names() {
        assert_eq!("MobileSAM".parse::<SamChoice>().unwrap(), SamChoice::MobileSam);
        assert_eq!("SAM".parse::<SamChoice>().unwrap(), SamChoice::Sam);
        assert_eq!(SamChoice::default().to_string(), "MobileSAM");
        assert!("sam2".parse::<SamChoice>().is_err());
    }

    #[test]
    fn test_request_serializes_missing_prompts_as_null() {
        let coords = [[10, 10]];
        let labels = [1u8];
        let request = SamRequest {
            model: "MobileSAM",
            img_path: Some("https://host/a.jpg"),
            img_base64: None,
            point_coords: Some(&coords),
            point_labels: Some(&labels),
            input_box: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "MobileSAM",
                "img_path": "https://host/a.jpg",
                "point_coords": [[10, 10]],
                "point_labels": [1],
                "input_box": null
            })
        );
    }

    #[test]
    fn test_request_with_image_bytes() {
        let request = SamRequest {
            model: "SAM",
            img_path: None,
            img_base64: Some(STANDARD.encode([1u8, 2, 3])),
            point_coords: None,
            point_labels: None,
            input_box: Some([1, 2, 3, 4]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["img_path"], serde_json::Value::Null);
        assert_eq!(value["img_base64"], "AQID");
        assert_eq!(value["input_box"], serde_json::json!([1, 2, 3, 4]));
    }

    #[actix_web::test]
    async fn test_masks_decoded_from_service_response() {
        let mut server = mockito::Server::new_async().await;
        let mask = ndarray::Array2::from_shape_fn((2, 3), |(r, _)| u8::from(r == 0));
        let body = serde_json::json!({
            "masks": [crate::predictor::mask::encode_png_mask(&mask)],
            "probs": [0.75]
        });
        let endpoint = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "MobileSAM",
                "img_base64": "AQID",
                "point_coords": [[1, 0]],
                "point_labels": [1]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let predictor = RemoteSamPredictor::new(
            Url::parse(&format!("{}/predict", server.url())).unwrap(),
            SamChoice::MobileSam,
        );
        let masks = predictor
            .predict(
                &ImageInput::Bytes(vec![1, 2, 3]),
                3,
                2,
                Some([[1, 0]].as_slice()),
                Some([1u8].as_slice()),
                None,
            )
            .await
            .unwrap();

        endpoint.assert_async().await;
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].score, Some(0.75));
        assert_eq!(masks[0].mask.row(0).to_vec(), vec![255, 255, 255]);
        assert_eq!(masks[0].mask.row(1).to_vec(), vec![0, 0, 0]);
    }

    #[actix_web::test]
    async fn test_unreachable_service_is_an_http_error() {
        let predictor = RemoteSamPredictor::new(
            Url::parse("http://127.0.0.1:9/predict").unwrap(),
            SamChoice::MobileSam,
        );
        let result = predictor
            .predict(&ImageInput::Url("a.jpg".into()), 4, 4, None, None, None)
            .await;
        assert!(matches!(result, Err(PredictorError::Http(_))));
    }
}
