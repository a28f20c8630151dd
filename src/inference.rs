use crate::{
    annotate,
    config::Config,
    engine::{Detector, ImagePrediction, ModelInfo, PredictIn},
    report::{self, Detection, FailedImage, ImageResult, InferenceSummary},
    util::{ensure_dir, file_name_string, list_files_with_extensions, now_rfc3339},
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct InferenceOptions {
    pub model: PathBuf,
    pub image: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub conf: f32,
    pub iou: f32,
    pub save_images: bool,
    pub output_csv: Option<PathBuf>,
    pub output_json: Option<PathBuf>,
}

impl InferenceOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            model: PathBuf::from(&cfg.inference.model),
            image: None,
            directory: None,
            conf: cfg.inference.conf,
            iou: cfg.inference.iou,
            save_images: cfg.inference.save_images,
            output_csv: None,
            output_json: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRun {
    pub model: String,
    pub classes: Vec<String>,
    pub started: String,
    pub finished: String,
    pub summary: InferenceSummary,
    #[serde(skip)]
    pub results: Vec<ImageResult>,
    pub annotated: Vec<String>,
    pub csv: Option<String>,
    pub json: Option<String>,
}

pub struct InferenceRunner<D: Detector> {
    cfg: Config,
    detector: D,
}

impl<D: Detector> InferenceRunner<D> {
    pub fn new(cfg: &Config, detector: D) -> Self {
        Self {
            cfg: cfg.clone(),
            detector,
        }
    }

    pub fn run(&self, opts: &InferenceOptions) -> Result<InferenceRun> {
        let images = resolve_inputs(&self.cfg, opts)?;
        let started = now_rfc3339();

        let checkpoint = opts.model.display().to_string();
        info!("loading model from {checkpoint}");
        let model = self.detector.model_info(&checkpoint)?;
        let classes = model.class_names();
        info!("model loaded; classes: {classes:?}");

        info!(
            "processing {} image(s) conf={} iou={}",
            images.len(),
            opts.conf,
            opts.iou
        );
        let req = PredictIn {
            checkpoint,
            images: images.iter().map(|p| p.display().to_string()).collect(),
            conf: opts.conf,
            iou: opts.iou,
            stop_on_error: !self.cfg.inference.continue_on_error,
        };
        let predictions = self.detector.predict(&req)?;

        let models_dir = PathBuf::from(&self.cfg.paths.models_dir);
        let mut results = Vec::with_capacity(images.len());
        let mut failed = Vec::new();
        let mut annotated = Vec::new();

        for (i, path) in images.iter().enumerate() {
            let filename = file_name_string(path);
            let outcome = predictions
                .get(i)
                .ok_or_else(|| anyhow!("no prediction returned"))
                .and_then(|p| to_result(&model, &filename, p));

            let outcome = outcome.and_then(|result| {
                let dest = if opts.save_images {
                    ensure_dir(&models_dir)?;
                    let dest = annotated_path(&self.cfg, path);
                    let line_width = self.cfg.inference.line_width;
                    annotate::annotate_file(path, &dest, &result.detections, line_width)?;
                    Some(dest)
                } else {
                    None
                };
                Ok((result, dest))
            });

            let (result, dest) = match outcome {
                Ok(r) => r,
                Err(err) if self.cfg.inference.continue_on_error => {
                    warn!("skipping {filename}: {err:#}");
                    failed.push(FailedImage {
                        filename,
                        error: format!("{err:#}"),
                    });
                    continue;
                }
                Err(err) => return Err(err.context(format!("inference failed on {filename}"))),
            };

            info!("{}: {} object(s)", result.filename, result.total_count);
            for (class, n) in &result.class_counts {
                debug!("  {class}: {n}");
            }
            if let Some(dest) = dest {
                info!("saved annotated image {}", dest.display());
                annotated.push(dest.display().to_string());
            }
            results.push(result);
        }

        let mut summary = report::aggregate(&results);
        summary.failed = failed;
        info!(
            "processed {} image(s), {} object(s) total",
            summary.images, summary.total_objects
        );
        for (class, n) in &summary.by_class {
            info!("  {class}: {n}");
        }

        let csv_path = match (&opts.output_csv, &opts.directory) {
            (Some(p), _) => Some(p.clone()),
            (None, Some(_)) => Some(models_dir.join(&self.cfg.inference.results_csv_filename)),
            (None, None) => None,
        };
        if let Some(path) = &csv_path {
            report::write_csv(path, &classes, &results)?;
            info!("results saved to CSV: {}", path.display());
        }
        if let Some(path) = &opts.output_json {
            report::write_json(path, &results)?;
            info!("detailed results saved to JSON: {}", path.display());
        }

        Ok(InferenceRun {
            model: opts.model.display().to_string(),
            classes,
            started,
            finished: now_rfc3339(),
            summary,
            results,
            annotated,
            csv: csv_path.map(|p| p.display().to_string()),
            json: opts.output_json.as_ref().map(|p| p.display().to_string()),
        })
    }
}

/// Validates the checkpoint and inputs and lists the images to process, in
/// order. Nothing is written.
pub fn resolve_inputs(cfg: &Config, opts: &InferenceOptions) -> Result<Vec<PathBuf>> {
    if opts.image.is_none() && opts.directory.is_none() {
        return Err(anyhow!("must specify either --image or --directory"));
    }
    if !opts.model.is_file() {
        return Err(anyhow!("model not found: {}", opts.model.display()));
    }
    let mut images = Vec::new();
    if let Some(image) = &opts.image {
        if !image.is_file() {
            return Err(anyhow!("image not found: {}", image.display()));
        }
        images.push(image.clone());
    }
    if let Some(dir) = &opts.directory {
        if !dir.is_dir() {
            return Err(anyhow!("directory not found: {}", dir.display()));
        }
        let found = list_files_with_extensions(dir, &cfg.inference.image_extensions)
            .with_context(|| format!("listing images in {}", dir.display()))?;
        images.extend(found);
    }
    if images.is_empty() {
        return Err(anyhow!("no images to process"));
    }
    Ok(images)
}

fn to_result(model: &ModelInfo, filename: &str, pred: &ImagePrediction) -> Result<ImageResult> {
    if let Some(err) = &pred.error {
        return Err(anyhow!("{err}"));
    }
    let detections = pred
        .boxes
        .iter()
        .map(|b| Detection {
            class_name: class_name(model, b.class_id),
            confidence: b.confidence,
            bbox: b.xyxy,
            class_id: b.class_id,
        })
        .collect();
    Ok(ImageResult::from_detections(filename.to_string(), detections))
}

fn class_name(model: &ModelInfo, class_id: u32) -> String {
    model
        .names
        .get(&class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{class_id}"))
}

pub fn annotated_path(cfg: &Config, image: &Path) -> PathBuf {
    Path::new(&cfg.paths.models_dir).join(format!("annotated_{}", file_name_string(image)))
}
