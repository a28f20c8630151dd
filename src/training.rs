use crate::{
    config::Config,
    dataset::DatasetDescriptor,
    engine::{Detector, TrainIn},
    util::{ensure_dir, list_files_with_extensions, megabytes, now_rfc3339, sha256_file},
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub data: PathBuf,
    pub epochs: u32,
    pub batch: u32,
    pub imgsz: u32,
    pub device: String,
    pub name: String,
    pub patience: u32,
}

impl TrainOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            data: PathBuf::from(&cfg.train.data),
            epochs: cfg.train.epochs,
            batch: cfg.train.batch,
            imgsz: cfg.train.imgsz,
            device: cfg.train.device.clone(),
            name: cfg.train.name.clone(),
            patience: cfg.train.patience,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointCopy {
    pub source: String,
    pub target: String,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub data: String,
    pub classes: Vec<String>,
    pub training_images: Option<usize>,
    pub base_checkpoint: String,
    pub run_dir: String,
    pub checkpoint: Option<CheckpointCopy>,
    pub metrics: serde_json::Value,
    pub started: String,
    pub finished: String,
}

pub struct Trainer<D: Detector> {
    cfg: Config,
    detector: D,
}

impl<D: Detector> Trainer<D> {
    pub fn new(cfg: &Config, detector: D) -> Self {
        Self {
            cfg: cfg.clone(),
            detector,
        }
    }

    pub fn run(&self, opts: &TrainOptions) -> Result<TrainReport> {
        if !opts.data.is_file() {
            return Err(anyhow!(
                "dataset configuration not found: {}",
                opts.data.display()
            ));
        }

        let descriptor = DatasetDescriptor::load(&opts.data)?;
        let classes = descriptor.class_names();
        info!("dataset {} classes={classes:?}", opts.data.display());
        if let Some((nc, names)) = descriptor.class_count_mismatch() {
            warn!("dataset declares nc={nc} but lists {names} class name(s)");
        }

        let training_images = self.count_training_images(&descriptor, &opts.data)?;

        let started = now_rfc3339();
        let req = TrainIn {
            data: opts.data.display().to_string(),
            base_checkpoint: self.cfg.train.base_checkpoint.clone(),
            project: self.cfg.paths.runs_dir.clone(),
            name: opts.name.clone(),
            epochs: opts.epochs,
            batch: opts.batch,
            imgsz: opts.imgsz,
            device: opts.device.clone(),
            patience: opts.patience,
            plots: self.cfg.train.plots,
        };
        info!(
            "training from {} epochs={} batch={} imgsz={} device={} patience={}",
            req.base_checkpoint, req.epochs, req.batch, req.imgsz, req.device, req.patience
        );

        let out = self
            .detector
            .train(&req)
            .with_context(|| format!("training run {}", opts.name))?;
        info!("training completed");

        let run_dir = out
            .save_dir
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(&self.cfg.paths.runs_dir).join(&opts.name));
        let source = out
            .best_checkpoint
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| run_dir.join("weights").join("best.pt"));

        let checkpoint = if source.is_file() {
            Some(self.promote_checkpoint(&source)?)
        } else {
            warn!("no best checkpoint found at {}", source.display());
            None
        };
        info!("training results saved to {}", run_dir.display());

        Ok(TrainReport {
            data: opts.data.display().to_string(),
            classes,
            training_images,
            base_checkpoint: req.base_checkpoint,
            run_dir: run_dir.display().to_string(),
            checkpoint,
            metrics: out.metrics,
            started,
            finished: now_rfc3339(),
        })
    }

    fn count_training_images(
        &self,
        descriptor: &DatasetDescriptor,
        data: &Path,
    ) -> Result<Option<usize>> {
        let exts = ["png".to_string(), "jpg".to_string()];
        let mut n = 0;
        let mut found_dir = false;
        for dir in descriptor.train_dirs(data) {
            if !dir.is_dir() {
                warn!("training image directory not found: {}", dir.display());
                continue;
            }
            found_dir = true;
            n += list_files_with_extensions(&dir, &exts)?.len();
        }
        if !found_dir {
            return Ok(None);
        }
        info!("training images: {n}");
        if n < self.cfg.train.min_training_images {
            warn!(
                "fewer than {} training images found; consider adding more data",
                self.cfg.train.min_training_images
            );
        }
        Ok(Some(n))
    }

    fn promote_checkpoint(&self, source: &Path) -> Result<CheckpointCopy> {
        let models_dir = Path::new(&self.cfg.paths.models_dir);
        ensure_dir(models_dir)?;
        let target = models_dir.join("best.pt");
        let bytes = std::fs::copy(source, &target).with_context(|| {
            format!("copy {} -> {}", source.display(), target.display())
        })?;
        let sha256 = sha256_file(&target)?;
        info!(
            "best model saved to {} ({:.2} MB)",
            target.display(),
            megabytes(bytes)
        );
        Ok(CheckpointCopy {
            source: source.display().to_string(),
            target: target.display().to_string(),
            bytes,
            sha256,
        })
    }
}
