pub mod poppler;
pub mod python;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{
    DependencyCheck, DetectorDiag, ImagePrediction, ModelInfo, PredictIn, PredictOut, RawBox,
    RenderPage, TrainIn, TrainOut,
};

/// Document rasterization backend.
pub trait Rasterizer {
    /// One check per external tool the backend depends on.
    fn doctor(&self) -> Vec<DependencyCheck>;
    fn page_count(&self, input: &Path) -> Result<u32>;
    /// Renders one page to `req.output` and returns the written path.
    fn render_page(&self, req: &RenderPage) -> Result<std::path::PathBuf>;
}

/// Object-detection backend.
pub trait Detector {
    fn doctor(&self) -> Result<DetectorDiag>;
    fn model_info(&self, checkpoint: &str) -> Result<ModelInfo>;
    fn train(&self, req: &TrainIn) -> Result<TrainOut>;
    /// Predictions come back in the order of `req.images`. When
    /// `req.stop_on_error` is set the backend stops at the first failing image.
    fn predict(&self, req: &PredictIn) -> Result<Vec<ImagePrediction>>;
}
