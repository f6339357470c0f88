use serde::Serialize;
use shared::{InteractionContext, InteractionEvent, RegionType};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Interaction event {index} of type '{kind}' carries no label")]
    MissingLabel { index: usize, kind: String },
    #[error("Rectangle event {0} has no width or height")]
    MissingBoxSize(usize),
}

/// Point and box prompts gathered from prior interactions, in pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptSet {
    pub point_coords: Vec<[i32; 2]>,
    pub point_labels: Vec<u8>,
    pub input_box: Option<[i32; 4]>,
    pub selected_label: Option<String>,
}

impl PromptSet {
    pub fn point_coords(&self) -> Option<&[[i32; 2]]> {
        (!self.point_coords.is_empty()).then_some(self.point_coords.as_slice())
    }

    pub fn point_labels(&self) -> Option<&[u8]> {
        (!self.point_labels.is_empty()).then_some(self.point_labels.as_slice())
    }
}

/// Image size recorded on the first event of the context.
pub fn context_size(context: &InteractionContext) -> Option<(u32, u32)> {
    context
        .result
        .first()
        .map(|event| (event.original_width, event.original_height))
}

fn to_pixels(percent: f64, extent: u32) -> f64 {
    percent * f64::from(extent) / 100.0
}

/// Builds prompts from the interaction events.
///
/// The label of the last event processed becomes the selected label whatever
/// its type. Only the last rectangle is kept as the box.
pub fn extract_prompts(
    events: &[InteractionEvent],
    width: u32,
    height: u32,
) -> Result<PromptSet, PromptError> {
    let mut prompts = PromptSet::default();

    for (index, event) in events.iter().enumerate() {
        let x = to_pixels(event.value.x, width);
        let y = to_pixels(event.value.y, height);

        let label = event
            .value
            .first_label(&event.kind)
            .ok_or_else(|| PromptError::MissingLabel {
                index,
                kind: event.kind.clone(),
            })?;
        prompts.selected_label = Some(label.to_string());

        match event.region_type() {
            Some(RegionType::KeyPointLabels) => {
                prompts
                    .point_labels
                    .push(u8::from(event.is_positive.unwrap_or(false)));
                prompts.point_coords.push([x as i32, y as i32]);
            }
            Some(RegionType::RectangleLabels) => {
                let (Some(w), Some(h)) = (event.value.width, event.value.height) else {
                    return Err(PromptError::MissingBoxSize(index));
                };
                let box_width = to_pixels(w, width);
                let box_height = to_pixels(h, height);
                prompts.input_box = Some([
                    x as i32,
                    y as i32,
                    (box_width + x) as i32,
                    (box_height + y) as i32,
                ]);
            }
            _ => {}
        }
    }

    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> InteractionEvent {
        serde_json::from_value(value).unwrap()
    }

    fn point(x: f64, y: f64, positive: bool, label: &str) -> InteractionEvent {
        event(json!({
            "original_width": 1080,
            "original_height": 1080,
            "type": "keypointlabels",
            "is_positive": positive,
            "value": { "x": x, "y": y, "keypointlabels": [label] }
        }))
    }

    fn rect(x: f64, y: f64, w: f64, h: f64, label: &str) -> InteractionEvent {
        event(json!({
            "original_width": 1080,
            "original_height": 1080,
            "type": "rectanglelabels",
            "value": { "x": x, "y": y, "width": w, "height": h, "rectanglelabels": [label] }
        }))
    }

    #[test]
    fn test_half_way_point_maps_to_centre_pixel() {
        let prompts = extract_prompts(&[point(50.0, 50.0, true, "Banana")], 1080, 1080).unwrap();
        assert_eq!(prompts.point_coords, vec![[540, 540]]);
        assert_eq!(prompts.point_labels, vec![1]);
        assert_eq!(prompts.input_box, None);
    }

    #[test]
    fn test_coordinates_truncate() {
        let prompts =
            extract_prompts(&[point(49.441786283891545, 59.96810207336522, false, "Banana")], 1080, 1080)
                .unwrap();
        // 533.97 and 647.65
        assert_eq!(prompts.point_coords, vec![[533, 647]]);
        assert_eq!(prompts.point_labels, vec![0]);
    }

    #[test]
    fn test_missing_positivity_counts_as_negative() {
        let mut negative = point(10.0, 10.0, true, "Banana");
        negative.is_positive = None;
        let prompts = extract_prompts(&[negative], 100, 100).unwrap();
        assert_eq!(prompts.point_labels, vec![0]);
    }

    #[test]
    fn test_last_rectangle_wins() {
        let events = [
            rect(10.0, 10.0, 20.0, 20.0, "Banana"),
            rect(50.0, 40.0, 10.0, 30.0, "Orange"),
        ];
        let prompts = extract_prompts(&events, 200, 100).unwrap();
        assert_eq!(prompts.input_box, Some([100, 40, 120, 70]));
        assert!(prompts.point_coords.is_empty());
    }

    #[test]
    fn test_box_corner_truncates_the_sum() {
        // x = 1.5px, width = 1.6px: trunc(3.1) = 3, not 1 + 1
        let prompts = extract_prompts(&[rect(1.5, 1.5, 1.6, 1.6, "Banana")], 100, 100).unwrap();
        assert_eq!(prompts.input_box, Some([1, 1, 3, 3]));
    }

    #[test]
    fn test_selected_label_follows_last_event() {
        let events = [
            point(10.0, 10.0, true, "Banana"),
            rect(10.0, 10.0, 20.0, 20.0, "Orange"),
        ];
        let prompts = extract_prompts(&events, 100, 100).unwrap();
        assert_eq!(prompts.selected_label.as_deref(), Some("Orange"));

        let reversed = [events[1].clone(), events[0].clone()];
        let prompts = extract_prompts(&reversed, 100, 100).unwrap();
        assert_eq!(prompts.selected_label.as_deref(), Some("Banana"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let events = [
            point(12.5, 80.0, true, "Banana"),
            point(30.0, 20.0, false, "Banana"),
            rect(5.0, 5.0, 50.0, 50.0, "Orange"),
        ];
        let first = extract_prompts(&events, 640, 480).unwrap();
        let second = extract_prompts(&events, 640, 480).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.point_coords, vec![[80, 384], [192, 96]]);
        assert_eq!(first.point_labels, vec![1, 0]);
    }

    #[test]
    fn test_unknown_region_contributes_label_only() {
        let brush = event(json!({
            "original_width": 100,
            "original_height": 100,
            "type": "brushlabels",
            "value": { "x": 0.0, "y": 0.0, "brushlabels": ["Orange"] }
        }));
        let prompts = extract_prompts(&[point(10.0, 10.0, true, "Banana"), brush], 100, 100).unwrap();
        assert_eq!(prompts.point_coords, vec![[10, 10]]);
        assert_eq!(prompts.selected_label.as_deref(), Some("Orange"));
    }

    #[test]
    fn test_event_without_label_is_rejected() {
        let unlabeled = event(json!({
            "original_width": 100,
            "original_height": 100,
            "type": "keypointlabels",
            "value": { "x": 1.0, "y": 1.0 }
        }));
        assert!(matches!(
            extract_prompts(&[unlabeled], 100, 100),
            Err(PromptError::MissingLabel { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_prompt_lists_read_as_absent() {
        let prompts = extract_prompts(&[rect(0.0, 0.0, 10.0, 10.0, "Banana")], 100, 100).unwrap();
        assert!(prompts.point_coords().is_none());
        assert!(prompts.point_labels().is_none());
    }

    #[test]
    fn test_context_size_comes_from_first_event() {
        let context = InteractionContext {
            result: vec![point(1.0, 1.0, true, "Banana")],
        };
        assert_eq!(context_size(&context), Some((1080, 1080)));
        assert_eq!(context_size(&InteractionContext::default()), None);
    }
}
