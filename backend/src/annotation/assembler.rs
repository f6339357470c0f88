use std::collections::BTreeSet;

use ndarray::{Array2, ArrayView2};
use shared::{BrushValue, Prediction, PredictionResult, RegionType};

use super::ids::IdGenerator;
use super::labels::LabelMap;
use super::rle::{RleError, mask_to_rle};

/// A binary mask (`height x width`, 0 or 255) with the model's confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMask {
    pub mask: Array2<u8>,
    pub score: Option<f32>,
}

/// Control names the results are attached to in the labeling config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTarget {
    pub from_name: String,
    pub to_name: String,
}

impl RegionTarget {
    pub fn new(from_name: impl Into<String>, to_name: impl Into<String>) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
        }
    }
}

fn brush_result(
    mask: ArrayView2<u8>,
    score: Option<f32>,
    width: u32,
    height: u32,
    target: &RegionTarget,
    label: &str,
    ids: &mut impl IdGenerator,
) -> Result<PredictionResult, RleError> {
    Ok(PredictionResult {
        id: ids.next_id(),
        from_name: target.from_name.clone(),
        to_name: target.to_name.clone(),
        kind: RegionType::BrushLabels,
        original_width: width,
        original_height: height,
        image_rotation: 0,
        value: BrushValue {
            format: "rle".to_string(),
            rle: mask_to_rle(mask)?,
            brushlabels: vec![label.to_string()],
        },
        score,
        readonly: false,
    })
}

/// One prediction holding every mask under the same label.
pub fn interactive_prediction(
    masks: &[ScoredMask],
    width: u32,
    height: u32,
    target: &RegionTarget,
    label: &str,
    model_version: &str,
    ids: &mut impl IdGenerator,
) -> Result<Vec<Prediction>, RleError> {
    let result = masks
        .iter()
        .map(|m| brush_result(m.mask.view(), m.score, width, height, target, label, &mut *ids))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(vec![Prediction {
        result,
        model_version: Some(model_version.to_string()),
    }])
}

/// One result per mapped class present in `class_map`, in ascending class order.
pub fn semantic_prediction(
    class_map: ArrayView2<u8>,
    labels: &LabelMap,
    target: &RegionTarget,
    ids: &mut impl IdGenerator,
) -> Result<Vec<Prediction>, RleError> {
    let (height, width) = class_map.dim();
    let merged = class_map.mapv(|class| labels.merged(class));
    let present: BTreeSet<u8> = merged.iter().copied().collect();

    let mut result = Vec::new();
    for class in present {
        let Some(label) = labels.label(class) else {
            continue;
        };
        let mask = merged.mapv(|c| if c == class { 255 } else { 0 });
        result.push(brush_result(
            mask.view(),
            None,
            width as u32,
            height as u32,
            target,
            label,
            &mut *ids,
        )?);
    }

    Ok(vec![Prediction {
        result,
        model_version: None,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ids::{AlphanumericId, UniqueIds, UuidFragment};
    use crate::annotation::rle::rle_to_mask;
    use ndarray::s;

    fn target() -> RegionTarget {
        RegionTarget::new("tag", "image")
    }

    #[test]
    fn test_interactive_results_share_label_and_version() {
        let mut first = Array2::<u8>::zeros((8, 6));
        first.slice_mut(s![2..5, 1..4]).fill(255);
        let masks = vec![
            ScoredMask { mask: first.clone(), score: Some(0.9) },
            ScoredMask { mask: Array2::zeros((8, 6)), score: Some(0.2) },
        ];

        let predictions = interactive_prediction(
            &masks,
            6,
            8,
            &target(),
            "Banana",
            "MobileSAM",
            &mut UniqueIds::new(UuidFragment),
        )
        .unwrap();

        assert_eq!(predictions.len(), 1);
        let prediction = &predictions[0];
        assert_eq!(prediction.model_version.as_deref(), Some("MobileSAM"));
        assert_eq!(prediction.result.len(), 2);
        assert_ne!(prediction.result[0].id, prediction.result[1].id);
        for result in &prediction.result {
            assert_eq!(result.value.brushlabels, vec!["Banana".to_string()]);
            assert_eq!(result.image_rotation, 0);
            assert_eq!((result.original_width, result.original_height), (6, 8));
            assert_eq!(result.kind, RegionType::BrushLabels);
            assert_eq!(result.value.format, "rle");
        }
        assert_eq!(prediction.result[0].score, Some(0.9));
        assert_eq!(rle_to_mask(&prediction.result[0].value.rle, 6, 8).unwrap(), first);
    }

    #[test]
    fn test_semantic_drops_unmapped_classes() {
        // 0 background, 2 hair, 4 upper-clothes, 6 pants
        let class_map = Array2::from_shape_fn((4, 4), |(r, _)| [0u8, 2, 4, 6][r]);
        let predictions = semantic_prediction(
            class_map.view(),
            &LabelMap::default(),
            &target(),
            &mut UniqueIds::new(AlphanumericId::default()),
        )
        .unwrap();

        let prediction = &predictions[0];
        assert!(prediction.model_version.is_none());
        let labels: Vec<&str> = prediction
            .result
            .iter()
            .map(|r| r.value.brushlabels[0].as_str())
            .collect();
        assert_eq!(labels, vec!["upper-clothes", "pants"]);

        let pants = rle_to_mask(&prediction.result[1].value.rle, 4, 4).unwrap();
        assert_eq!(pants.row(3).to_vec(), vec![255; 4]);
        assert_eq!(pants.row(2).to_vec(), vec![0; 4]);
        assert!(prediction.result.iter().all(|r| r.id.len() == 10 && r.score.is_none()));
    }

    #[test]
    fn test_right_shoe_is_indistinguishable_from_left_shoe() {
        let with_right = Array2::from_shape_fn((3, 5), |(r, c)| if r == 1 && c > 1 { 10u8 } else { 0 });
        let with_left = with_right.mapv(|c| if c == 10 { 9 } else { c });

        let encode = |map: &Array2<u8>| {
            semantic_prediction(map.view(), &LabelMap::default(), &target(), &mut AlphanumericId::default())
                .unwrap()
                .remove(0)
                .result
                .into_iter()
                .map(|r| (r.value.brushlabels, r.value.rle))
                .collect::<Vec<_>>()
        };

        let right = encode(&with_right);
        assert_eq!(right, encode(&with_left));
        assert_eq!(right.len(), 1);
        assert_eq!(right[0].0, vec!["footwear".to_string()]);
    }

    #[test]
    fn test_mixed_shoes_become_one_region() {
        let class_map = Array2::from_shape_vec((1, 4), vec![9u8, 10, 0, 10]).unwrap();
        let predictions =
            semantic_prediction(class_map.view(), &LabelMap::default(), &target(), &mut AlphanumericId::default())
                .unwrap();
        let result = &predictions[0].result;
        assert_eq!(result.len(), 1);
        let mask = rle_to_mask(&result[0].value.rle, 4, 1).unwrap();
        assert_eq!(mask.row(0).to_vec(), vec![255, 255, 0, 255]);
    }

    #[test]
    fn test_background_only_image_yields_empty_result() {
        let predictions = semantic_prediction(
            Array2::<u8>::zeros((5, 5)).view(),
            &LabelMap::default(),
            &target(),
            &mut AlphanumericId::default(),
        )
        .unwrap();
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0].result.is_empty());
    }
}
