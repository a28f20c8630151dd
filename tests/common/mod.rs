#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use takeoff_kit::engine::{
    DependencyCheck, Detector, DetectorDiag, ImagePrediction, ModelInfo, PredictIn, RawBox,
    Rasterizer, RenderPage, TrainIn, TrainOut,
};

/// Writes a placeholder file per rendered page.
pub struct FakeRasterizer {
    pub pages: u32,
    pub rendered: Rc<RefCell<Vec<u32>>>,
}

impl FakeRasterizer {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            rendered: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn doctor(&self) -> Vec<DependencyCheck> {
        vec![
            DependencyCheck::passed("pdftoppm", Some("24.02.0".into())),
            DependencyCheck::passed("pdfinfo", Some("24.02.0".into())),
        ]
    }

    fn page_count(&self, input: &Path) -> Result<u32> {
        if input.to_string_lossy().contains("broken") {
            return Err(anyhow!("Syntax Error: Couldn't read xref table"));
        }
        Ok(self.pages)
    }

    fn render_page(&self, req: &RenderPage) -> Result<PathBuf> {
        std::fs::write(&req.output, b"page")?;
        self.rendered.borrow_mut().push(req.page);
        Ok(req.output.clone())
    }
}

pub fn bx(class_id: u32, confidence: f32) -> RawBox {
    RawBox {
        class_id,
        confidence,
        xyxy: [10.0, 10.0, 40.0, 30.0],
    }
}

/// In-process detector keyed by image file name.
#[derive(Default)]
pub struct FakeDetector {
    pub names: BTreeMap<u32, String>,
    pub boxes: HashMap<String, Vec<RawBox>>,
    pub failing_image: Option<String>,
    pub missing_modules: Vec<String>,
    pub model_loads: Rc<Cell<usize>>,
    pub train_calls: Rc<Cell<usize>>,
}

impl FakeDetector {
    pub fn with_classes(names: &[&str]) -> Self {
        Self {
            names: names
                .iter()
                .enumerate()
                .map(|(i, n)| (i as u32, n.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

impl Detector for FakeDetector {
    fn doctor(&self) -> Result<DetectorDiag> {
        let checks = ["ultralytics", "torch", "cv2"]
            .iter()
            .map(|m| {
                if self.missing_modules.iter().any(|x| x == m) {
                    DependencyCheck::failed(m, format!("No module named '{m}'"))
                } else {
                    DependencyCheck::passed(m, Some("1.0".into()))
                }
            })
            .collect();
        Ok(DetectorDiag {
            python_exe: "python3".into(),
            python_version: "3.11.9".into(),
            device: Some("cpu".into()),
            checks,
        })
    }

    fn model_info(&self, checkpoint: &str) -> Result<ModelInfo> {
        self.model_loads.set(self.model_loads.get() + 1);
        Ok(ModelInfo {
            checkpoint: checkpoint.to_string(),
            task: Some("detect".into()),
            names: self.names.clone(),
            error: None,
        })
    }

    fn train(&self, req: &TrainIn) -> Result<TrainOut> {
        self.train_calls.set(self.train_calls.get() + 1);
        let save_dir = Path::new(&req.project).join(&req.name);
        let weights = save_dir.join("weights");
        std::fs::create_dir_all(&weights)?;
        std::fs::write(weights.join("best.pt"), b"checkpoint-bytes")?;
        Ok(TrainOut {
            ok: true,
            save_dir: Some(save_dir.display().to_string()),
            best_checkpoint: None,
            metrics: serde_json::json!({"metrics/mAP50(B)": 0.5}),
            error: None,
        })
    }

    fn predict(&self, req: &PredictIn) -> Result<Vec<ImagePrediction>> {
        let mut out = Vec::new();
        for image in &req.images {
            let name = Path::new(image)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.failing_image.as_deref() == Some(name.as_str()) {
                out.push(ImagePrediction {
                    image: image.clone(),
                    boxes: Vec::new(),
                    error: Some("corrupt image".into()),
                });
                if req.stop_on_error {
                    break;
                }
                continue;
            }
            out.push(ImagePrediction {
                image: image.clone(),
                boxes: self.boxes.get(&name).cloned().unwrap_or_default(),
                error: None,
            });
        }
        Ok(out)
    }
}

/// Lists every file under `dir`, relative, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    out.sort();
    out
}
