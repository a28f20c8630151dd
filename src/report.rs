use crate::util::ensure_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    pub bbox: [f32; 4], // x1, y1, x2, y2 in pixels
    #[serde(skip)]
    pub class_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub filename: String,
    pub total_count: usize,
    #[serde(flatten)]
    pub class_counts: BTreeMap<String, usize>,
    pub detections: Vec<Detection>,
}

impl ImageResult {
    pub fn from_detections(filename: String, detections: Vec<Detection>) -> Self {
        let mut class_counts = BTreeMap::new();
        for det in &detections {
            *class_counts.entry(det.class_name.clone()).or_insert(0) += 1;
        }
        Self {
            filename,
            total_count: detections.len(),
            class_counts,
            detections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedImage {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceSummary {
    pub images: usize,
    pub total_objects: usize,
    pub by_class: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedImage>,
}

/// Per-class totals across images; always the sum of the per-image counts.
pub fn aggregate(results: &[ImageResult]) -> InferenceSummary {
    let mut by_class = BTreeMap::new();
    for r in results {
        for (class, n) in &r.class_counts {
            *by_class.entry(class.clone()).or_insert(0) += n;
        }
    }
    InferenceSummary {
        images: results.len(),
        total_objects: results.iter().map(|r| r.total_count).sum(),
        by_class,
        failed: Vec::new(),
    }
}

/// Classes that occur in `results`, in model order, then any unknown names.
pub fn class_columns(model_classes: &[String], results: &[ImageResult]) -> Vec<String> {
    let seen: std::collections::BTreeSet<&String> =
        results.iter().flat_map(|r| r.class_counts.keys()).collect();
    let mut cols: Vec<String> = model_classes
        .iter()
        .filter(|c| seen.contains(c))
        .cloned()
        .collect();
    for extra in seen {
        if !cols.contains(extra) {
            cols.push(extra.clone());
        }
    }
    cols
}

/// One row per image: `filename,total_count,<class columns>`; absent classes are 0.
pub fn write_csv(path: &Path, model_classes: &[String], results: &[ImageResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let columns = class_columns(model_classes, results);
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("create CSV: {}", path.display()))?;

    let mut header = vec!["filename".to_string(), "total_count".to_string()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;

    for r in results {
        let mut row = vec![r.filename.clone(), r.total_count.to_string()];
        for col in &columns {
            row.push(r.class_counts.get(col).copied().unwrap_or(0).to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json(path: &Path, results: &[ImageResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(results)?)
        .with_context(|| format!("write JSON: {}", path.display()))
}
