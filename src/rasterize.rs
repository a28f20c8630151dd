use crate::{
    config::{Config, PageFormat},
    engine::{Rasterizer, RenderPage},
    page_range::PageRange,
    util::{ensure_dir, file_name_string, list_files_with_extensions},
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub output_dir: PathBuf,
    pub pages: Option<PageRange>,
    pub dpi: u32,
    pub format: PageFormat,
}

impl ConvertOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            output_dir: PathBuf::from(&cfg.paths.holding_dir),
            pages: None,
            dpi: cfg.rasterize.dpi,
            format: cfg.rasterize.format,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub input: String,
    pub page_count: u32,
    pub pages: PageRange,
    pub output_dir: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDocument {
    pub input: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub directory: String,
    pub found: usize,
    pub converted: Vec<DocumentReport>,
    pub failed: Vec<FailedDocument>,
}

/// `<stem>_page_<NNN>.<ext>`
pub fn page_file_name(stem: &str, page: u32, format: PageFormat) -> String {
    format!("{stem}_page_{page:03}.{}", format.extension())
}

pub struct PageConverter<R: Rasterizer> {
    opts: ConvertOptions,
    rasterizer: R,
}

impl<R: Rasterizer> PageConverter<R> {
    pub fn new(opts: ConvertOptions, rasterizer: R) -> Self {
        Self { opts, rasterizer }
    }

    pub fn convert(&self, input: &Path) -> Result<DocumentReport> {
        if !input.exists() {
            return Err(anyhow!("PDF not found: {}", input.display()));
        }

        let page_count = self
            .rasterizer
            .page_count(input)
            .with_context(|| format!("reading page count: {}", input.display()))?;
        if page_count == 0 {
            return Err(anyhow!("document has zero pages: {}", input.display()));
        }
        let pages = self.resolve_pages(page_count)?;

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;

        info!(
            "converting {} pages={} dpi={} format={:?} out={}",
            file_name_string(input),
            pages,
            self.opts.dpi,
            self.opts.format,
            self.opts.output_dir.display()
        );

        ensure_dir(&self.opts.output_dir)?;

        let mut files = Vec::with_capacity(pages.len() as usize);
        for page in pages.pages() {
            let req = RenderPage {
                input: input.to_path_buf(),
                page,
                dpi: self.opts.dpi,
                format: self.opts.format,
                output: self
                    .opts
                    .output_dir
                    .join(page_file_name(&stem, page, self.opts.format)),
            };
            let written = self
                .rasterizer
                .render_page(&req)
                .with_context(|| format!("rendering page {page} of {}", input.display()))?;
            info!("saved {}", file_name_string(&written));
            files.push(written.display().to_string());
        }

        Ok(DocumentReport {
            input: input.display().to_string(),
            page_count,
            pages,
            output_dir: self.opts.output_dir.display().to_string(),
            files,
        })
    }

    pub fn convert_batch(&self, dir: &Path) -> Result<BatchReport> {
        if !dir.is_dir() {
            return Err(anyhow!("directory not found: {}", dir.display()));
        }
        let pdfs = list_files_with_extensions(dir, &["pdf".to_string()])?;
        if pdfs.is_empty() {
            return Err(anyhow!("no PDF files found in: {}", dir.display()));
        }
        info!("found {} PDF file(s) in {}", pdfs.len(), dir.display());

        let mut converted = Vec::new();
        let mut failed = Vec::new();
        for pdf in &pdfs {
            match self.convert(pdf) {
                Ok(report) => converted.push(report),
                Err(err) => {
                    warn!("conversion failed for {}: {err:#}", pdf.display());
                    failed.push(FailedDocument {
                        input: pdf.display().to_string(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        info!("converted {}/{} document(s)", converted.len(), pdfs.len());

        Ok(BatchReport {
            directory: dir.display().to_string(),
            found: pdfs.len(),
            converted,
            failed,
        })
    }

    fn resolve_pages(&self, page_count: u32) -> Result<PageRange> {
        let Some(requested) = self.opts.pages else {
            return Ok(PageRange::all(page_count));
        };
        if requested.first > page_count {
            return Err(anyhow!(
                "page range {requested} starts past the end of a {page_count}-page document"
            ));
        }
        if requested.last > page_count {
            warn!("page range {requested} clamped to {page_count} pages");
            return Ok(PageRange {
                first: requested.first,
                last: page_count,
            });
        }
        Ok(requested)
    }
}
