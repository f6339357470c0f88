pub mod assembler;
pub mod ids;
pub mod label_config;
pub mod labels;
pub mod prompt;
pub mod rle;

pub use assembler::{RegionTarget, ScoredMask, interactive_prediction, semantic_prediction};
pub use ids::{AlphanumericId, IdGenerator, UniqueIds, UuidFragment};
pub use label_config::{BrushTarget, LabelConfigError, first_brush_target};
pub use labels::{LabelMap, LabelMapError};
pub use prompt::{PromptError, PromptSet, context_size, extract_prompts};
pub use rle::{RleError, mask_to_rle, rle_to_mask};
