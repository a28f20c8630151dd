use crate::{
    config::{Config, PageFormat},
    doctor,
    engine::{poppler::PopplerRasterizer, python::PythonDetector},
    inference::{self, InferenceOptions, InferenceRunner},
    page_range::PageRange,
    rasterize::{ConvertOptions, PageConverter},
    training::{TrainOptions, Trainer},
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "takeoff")]
#[command(about = "Blueprint takeoff toolkit: rasterize PDFs, train and run an object detector")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./takeoff.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert PDF pages to images in the holding area.
    Convert {
        /// PDF file to convert.
        #[arg(required_unless_present = "batch", conflicts_with = "batch")]
        pdf: Option<PathBuf>,
        /// Convert every PDF in this directory.
        #[arg(long)]
        batch: Option<PathBuf>,
        /// Page range, e.g. "1-5" or "3".
        #[arg(long)]
        pages: Option<String>,
        /// Output directory [default: data_holding]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Resolution in DPI [default: 300]
        #[arg(long)]
        dpi: Option<u32>,
        /// Output image format [default: PNG]
        #[arg(long, value_enum, ignore_case = true)]
        format: Option<PageFormat>,
    },
    /// Fine-tune the pretrained detector on a labeled dataset.
    Train {
        /// Dataset YAML [default: data_labeled/dataset.yaml]
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<u32>,
        #[arg(long)]
        batch: Option<u32>,
        #[arg(long)]
        imgsz: Option<u32>,
        /// cpu, cuda, or a device number.
        #[arg(long)]
        device: Option<String>,
        /// Run name [default: takeoff_mvp]
        #[arg(long)]
        name: Option<String>,
        /// Early stopping patience in epochs.
        #[arg(long)]
        patience: Option<u32>,
    },
    /// Count objects on one image or a directory of images.
    Infer {
        /// Trained checkpoint [default: models/best.pt]
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, required_unless_present = "directory")]
        image: Option<PathBuf>,
        #[arg(long)]
        directory: Option<PathBuf>,
        /// Confidence threshold (0.0-1.0).
        #[arg(long)]
        conf: Option<f32>,
        /// IoU threshold for NMS.
        #[arg(long)]
        iou: Option<f32>,
        /// Do not save annotated images.
        #[arg(long)]
        no_save_images: bool,
        #[arg(long)]
        output_csv: Option<PathBuf>,
        #[arg(long)]
        output_json: Option<PathBuf>,
    },
    /// Check that external tools and detector dependencies are installed.
    Doctor {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match args.cmd {
        Command::Convert {
            pdf,
            batch,
            pages,
            output,
            dpi,
            format,
        } => {
            let mut opts = ConvertOptions::from_config(&cfg);
            if let Some(raw) = pages.as_deref() {
                opts.pages = Some(PageRange::parse(raw)?);
            }
            if let Some(output) = output {
                opts.output_dir = output;
            }
            opts.dpi = dpi.unwrap_or(opts.dpi);
            opts.format = format.unwrap_or(opts.format);
            convert(&cfg, opts, pdf.as_deref(), batch.as_deref())
        }
        Command::Train {
            data,
            epochs,
            batch,
            imgsz,
            device,
            name,
            patience,
        } => {
            let defaults = TrainOptions::from_config(&cfg);
            let opts = TrainOptions {
                data: data.unwrap_or(defaults.data),
                epochs: epochs.unwrap_or(defaults.epochs),
                batch: batch.unwrap_or(defaults.batch),
                imgsz: imgsz.unwrap_or(defaults.imgsz),
                device: device.unwrap_or(defaults.device),
                name: name.unwrap_or(defaults.name),
                patience: patience.unwrap_or(defaults.patience),
            };
            train(&cfg, &opts)
        }
        Command::Infer {
            model,
            image,
            directory,
            conf,
            iou,
            no_save_images,
            output_csv,
            output_json,
        } => {
            let defaults = InferenceOptions::from_config(&cfg);
            let opts = InferenceOptions {
                model: model.unwrap_or(defaults.model),
                image,
                directory,
                conf: conf.unwrap_or(defaults.conf),
                iou: iou.unwrap_or(defaults.iou),
                save_images: defaults.save_images && !no_save_images,
                output_csv,
                output_json,
            };
            infer(&cfg, &opts)
        }
        Command::Doctor {} => doctor(&cfg),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config not found: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    let default = PathBuf::from("takeoff.toml");
    Ok(default.exists().then_some(default))
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON summary; logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.models_dir).join("takeoff.log"))
}

fn print_summary<T: Serialize>(cfg: &Config, value: &T) -> Result<()> {
    if cfg.global.print_summary {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

fn convert(
    cfg: &Config,
    opts: ConvertOptions,
    pdf: Option<&Path>,
    batch: Option<&Path>,
) -> Result<()> {
    let converter = PageConverter::new(opts, PopplerRasterizer::new(cfg));

    if let Some(dir) = batch {
        let report = converter.convert_batch(dir)?;
        print_summary(cfg, &report)?;
        if !report.failed.is_empty() {
            return Err(anyhow!(
                "{} of {} document(s) failed to convert",
                report.failed.len(),
                report.found
            ));
        }
        return Ok(());
    }

    let pdf = pdf.ok_or_else(|| anyhow!("specify a PDF path or --batch <dir>"))?;
    let report = converter.convert(pdf)?;
    info!(
        "conversion complete: {} page(s) in {}",
        report.files.len(),
        report.output_dir
    );
    print_summary(cfg, &report)
}

fn train(cfg: &Config, opts: &TrainOptions) -> Result<()> {
    // Checked here too so a missing descriptor is reported before the runner is resolved.
    if !opts.data.is_file() {
        return Err(anyhow!(
            "dataset configuration not found: {}",
            opts.data.display()
        ));
    }
    let trainer = Trainer::new(cfg, PythonDetector::new(cfg)?);
    let report = trainer.run(opts)?;
    print_summary(cfg, &report)
}

fn infer(cfg: &Config, opts: &InferenceOptions) -> Result<()> {
    inference::resolve_inputs(cfg, opts)?;
    let runner = InferenceRunner::new(cfg, PythonDetector::new(cfg)?);
    let run = runner.run(opts)?;
    print_summary(cfg, &run)
}

fn doctor(cfg: &Config) -> Result<()> {
    let report = doctor::check_environment(
        cfg,
        &PopplerRasterizer::new(cfg),
        PythonDetector::new(cfg),
    );
    print_summary(cfg, &report)?;
    if !report.ok() {
        return Err(anyhow!(
            "{} of {} check(s) failed",
            report.failed + usize::from(report.smoke_test.as_ref().is_some_and(|s| !s.ok)),
            report.checks.len() + usize::from(report.smoke_test.is_some())
        ));
    }
    info!("all checks passed; environment is ready");
    Ok(())
}
