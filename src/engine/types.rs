use crate::config::PageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyCheck {
    pub name: String,
    pub ok: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl DependencyCheck {
    pub fn passed(name: &str, version: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            ok: true,
            version,
            detail: None,
        }
    }

    pub fn failed(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            ok: false,
            version: None,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorDiag {
    pub python_exe: String,
    pub python_version: String,
    #[serde(default)]
    pub device: Option<String>,
    pub checks: Vec<DependencyCheck>,
}

#[derive(Debug, Clone)]
pub struct RenderPage {
    pub input: PathBuf,
    pub page: u32,
    pub dpi: u32,
    pub format: PageFormat,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub checkpoint: String,
    #[serde(default)]
    pub task: Option<String>,
    pub names: BTreeMap<u32, String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ModelInfo {
    /// Class names ordered by class id.
    pub fn class_names(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainIn {
    pub data: String,
    pub base_checkpoint: String,
    pub project: String,
    pub name: String,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    pub device: String,
    pub patience: u32,
    pub plots: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOut {
    pub ok: bool,
    #[serde(default)]
    pub save_dir: Option<String>,
    #[serde(default)]
    pub best_checkpoint: Option<String>,
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictIn {
    pub checkpoint: String,
    pub images: Vec<String>,
    pub conf: f32,
    pub iou: f32,
    pub stop_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBox {
    pub class_id: u32,
    pub confidence: f32,
    pub xyxy: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePrediction {
    pub image: String,
    #[serde(default)]
    pub boxes: Vec<RawBox>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictOut {
    #[serde(default)]
    pub results: Vec<ImagePrediction>,
    #[serde(default)]
    pub error: Option<String>,
}
