use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub rasterize: Rasterize,
    #[serde(default)]
    pub train: Train,
    #[serde(default)]
    pub inference: Inference,
    #[serde(default)]
    pub detector: Detector,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Staging area for rasterized pages awaiting review.
    pub holding_dir: String,
    /// Where the promoted checkpoint, annotated images and CSV results land.
    pub models_dir: String,
    /// Run root handed to the detector library for training output.
    pub runs_dir: String,
    pub scripts_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            holding_dir: "data_holding".into(),
            models_dir: "models".into(),
            runs_dir: "runs/detect".into(),
            scripts_dir: "scripts".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum PageFormat {
    Png,
    Jpeg,
}

impl PageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Png => "png",
            PageFormat::Jpeg => "jpg",
        }
    }

    /// Output switch understood by `pdftoppm`.
    pub fn pdftoppm_flag(self) -> &'static str {
        match self {
            PageFormat::Png => "-png",
            PageFormat::Jpeg => "-jpeg",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rasterize {
    pub dpi: u32,
    pub format: PageFormat,
    pub pdftoppm_exe: String,
    pub pdfinfo_exe: String,
}
impl Default for Rasterize {
    fn default() -> Self {
        Self {
            dpi: 300,
            format: PageFormat::Png,
            pdftoppm_exe: "pdftoppm".into(),
            pdfinfo_exe: "pdfinfo".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Train {
    pub data: String,
    pub base_checkpoint: String,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    pub device: String,
    pub name: String,
    pub patience: u32,
    pub plots: bool,
    pub min_training_images: usize,
}
impl Default for Train {
    fn default() -> Self {
        Self {
            data: "data_labeled/dataset.yaml".into(),
            base_checkpoint: "yolov8n.pt".into(),
            epochs: 20,
            batch: 8,
            imgsz: 640,
            device: "cpu".into(),
            name: "takeoff_mvp".into(),
            patience: 5,
            plots: true,
            min_training_images: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Inference {
    pub model: String,
    pub conf: f32,
    pub iou: f32,
    pub save_images: bool,
    pub image_extensions: Vec<String>,
    pub line_width: u32,
    pub continue_on_error: bool,
    pub results_csv_filename: String,
}
impl Default for Inference {
    fn default() -> Self {
        Self {
            model: "models/best.pt".into(),
            conf: 0.25,
            iou: 0.45,
            save_images: true,
            image_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            line_width: 2,
            continue_on_error: false,
            results_csv_filename: "takeoff_results.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Detector {
    pub python_exe: String,
    pub runner_script: String,
    pub doctor_timeout_seconds: u64,
    /// 0 disables the timeout.
    pub predict_timeout_seconds: u64,
    pub modules: Vec<String>,
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Detector {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            runner_script: "detector_runner.py".into(),
            doctor_timeout_seconds: 300,
            predict_timeout_seconds: 0,
            modules: ["ultralytics", "torch", "cv2", "PIL", "numpy", "yaml"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_python_stderr: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
        }
    }
}
