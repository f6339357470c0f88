use derive_more::{Deref, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};

/// Data key Label Studio uses when the labeling config does not name the value.
pub const DATA_UNDEFINED_NAME: &str = "$undefined$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegionType {
    KeyPointLabels,
    RectangleLabels,
    BrushLabels,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Task {
    /// Looks up a data field, falling back to the unnamed data slot when the
    /// field is missing or empty.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data
            .get(key)
            .filter(|v| !is_empty_value(v))
            .or_else(|| self.data.get(DATA_UNDEFINED_NAME))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventValue {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Label lists keyed by region type (`keypointlabels`, `rectanglelabels`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventValue {
    pub fn first_label(&self, kind: &str) -> Option<&str> {
        self.extra.get(kind)?.as_array()?.first()?.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub original_width: u32,
    pub original_height: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: EventValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_positive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
}

impl InteractionEvent {
    pub fn region_type(&self) -> Option<RegionType> {
        self.kind.parse().ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionContext {
    #[serde(default)]
    pub result: Vec<InteractionEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, From, Into, Deref)]
#[serde(transparent)]
pub struct Rle(Vec<u8>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushValue {
    pub format: String,
    pub rle: Rle,
    pub brushlabels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub id: String,
    pub from_name: String,
    pub to_name: String,
    #[serde(rename = "type")]
    pub kind: RegionType,
    pub original_width: u32,
    pub original_height: u32,
    pub image_rotation: u32,
    pub value: BrushValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prediction {
    pub result: Vec<PredictionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictParams {
    #[serde(default)]
    pub context: Option<InteractionContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub params: Option<PredictParams>,
    #[serde(default)]
    pub context: Option<InteractionContext>,
    #[serde(default)]
    pub label_config: Option<String>,
    #[serde(default)]
    pub project: Option<Value>,
}

impl PredictRequest {
    /// Older clients send the context at top level, newer ones under `params`.
    pub fn context(&self) -> Option<&InteractionContext> {
        self.context
            .as_ref()
            .or_else(|| self.params.as_ref().and_then(|p| p.context.as_ref()))
    }

    pub fn project_key(&self) -> Option<String> {
        self.project.as_ref().map(project_key)
    }
}

/// Body of `/setup`, sent when a project connects or its labeling config changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub project: Option<Value>,
    /// The project's labeling config.
    #[serde(default)]
    pub schema: Option<String>,
}

impl SetupRequest {
    pub fn project_key(&self) -> Option<String> {
        self.project.as_ref().map(project_key)
    }
}

/// Projects arrive as `"12.1700000000"` on setup and sometimes as a bare id on predict.
fn project_key(project: &Value) -> String {
    match project {
        Value::String(s) => s.split('.').next().unwrap_or_default().to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub results: Vec<Prediction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupResponse {
    pub model_version: String,
}
