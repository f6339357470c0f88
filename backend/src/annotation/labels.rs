use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LabelMapError {
    #[error("Failed to read label map {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid label map: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Which semantic classes become brush labels, and which raw classes are
/// folded into another before mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    pub labels: BTreeMap<u8, String>,
    #[serde(default)]
    pub merges: BTreeMap<u8, u8>,
}

impl Default for LabelMap {
    /// Clothing labels for `mattmdjaga/segformer_b2_clothes`. Background, hair,
    /// face, legs and arms are left out; right shoes fold into left shoes.
    fn default() -> Self {
        let labels = [
            (1, "hat"),
            (3, "other accessories"),
            (4, "upper-clothes"),
            (5, "skirt"),
            (6, "pants"),
            (7, "dress"),
            (8, "bag-belt"),
            (9, "footwear"),
            (10, "footwear"),
            (16, "bag-belt"),
            (17, "scarf-gloves"),
        ]
        .into_iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

        Self {
            labels,
            merges: BTreeMap::from([(10, 9)]),
        }
    }
}

impl LabelMap {
    pub fn load(path: &Path) -> Result<Self, LabelMapError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LabelMapError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn label(&self, class_id: u8) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    pub fn merged(&self, class_id: u8) -> u8 {
        self.merges.get(&class_id).copied().unwrap_or(class_id)
    }
}
