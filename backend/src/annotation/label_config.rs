use std::collections::HashMap;

use super::assembler::RegionTarget;

#[derive(Debug, thiserror::Error)]
pub enum LabelConfigError {
    #[error("Labeling config is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Where brush results go and which task field holds the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrushTarget {
    pub region: RegionTarget,
    pub value_key: String,
}

impl BrushTarget {
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        value_key: impl Into<String>,
    ) -> Self {
        Self {
            region: RegionTarget::new(from_name, to_name),
            value_key: value_key.into(),
        }
    }

    /// The target named by `label_config`, or `self` when there is no config
    /// or it has no `BrushLabels` control over an `Image`.
    pub fn for_config(&self, label_config: Option<&str>) -> Result<BrushTarget, LabelConfigError> {
        let Some(config) = label_config.filter(|c| !c.trim().is_empty()) else {
            return Ok(self.clone());
        };
        match first_brush_target(config)? {
            Some(target) => Ok(target),
            None => {
                log::debug!(
                    "No BrushLabels control over an Image in labeling config, using {}/{}",
                    self.region.from_name,
                    self.region.to_name
                );
                Ok(self.clone())
            }
        }
    }
}

/// First `BrushLabels` control whose `toName` points at an `Image`, with the
/// image's `$value` field name.
pub fn first_brush_target(label_config: &str) -> Result<Option<BrushTarget>, LabelConfigError> {
    let doc = roxmltree::Document::parse(label_config)?;

    let images: HashMap<&str, &str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("Image"))
        .filter_map(|n| Some((n.attribute("name")?, n.attribute("value")?)))
        .collect();

    for control in doc.descendants().filter(|n| n.has_tag_name("BrushLabels")) {
        let (Some(from_name), Some(to_names)) = (control.attribute("name"), control.attribute("toName"))
        else {
            continue;
        };
        for to_name in to_names.split(',').map(str::trim) {
            if let Some(value) = images.get(to_name) {
                return Ok(Some(BrushTarget::new(
                    from_name,
                    to_name,
                    value.trim_start_matches('$'),
                )));
            }
        }
    }
    Ok(None)
}
