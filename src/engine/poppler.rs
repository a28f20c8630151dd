use super::{types::*, Rasterizer};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Rasterizer backed by poppler's `pdfinfo` and `pdftoppm`.
pub struct PopplerRasterizer {
    pdftoppm_exe: String,
    pdfinfo_exe: String,
}

impl PopplerRasterizer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            pdftoppm_exe: cfg.rasterize.pdftoppm_exe.clone(),
            pdfinfo_exe: cfg.rasterize.pdfinfo_exe.clone(),
        }
    }

    fn tool_version(&self, exe: &str) -> DependencyCheck {
        // Both tools print their banner to stderr and exit 0 (older builds exit 99) on -v.
        match Command::new(exe).arg("-v").output() {
            Ok(out) => {
                let banner = format!(
                    "{}{}",
                    String::from_utf8_lossy(&out.stdout),
                    String::from_utf8_lossy(&out.stderr)
                );
                DependencyCheck::passed(exe, parse_version(&banner))
            }
            Err(err) => DependencyCheck::failed(
                exe,
                format!("failed to invoke {exe}: {err}; is poppler-utils installed?"),
            ),
        }
    }
}

impl Rasterizer for PopplerRasterizer {
    fn doctor(&self) -> Vec<DependencyCheck> {
        vec![
            self.tool_version(&self.pdftoppm_exe),
            self.tool_version(&self.pdfinfo_exe),
        ]
    }

    fn page_count(&self, input: &Path) -> Result<u32> {
        let out = Command::new(&self.pdfinfo_exe)
            .arg(input)
            .output()
            .with_context(|| {
                format!("failed to invoke {}; is poppler-utils installed?", self.pdfinfo_exe)
            })?;
        if !out.status.success() {
            return Err(anyhow!(
                "{} failed for {}: {}",
                self.pdfinfo_exe,
                input.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        parse_page_count(&stdout)
            .ok_or_else(|| anyhow!("no page count in pdfinfo output for {}", input.display()))
    }

    fn render_page(&self, req: &RenderPage) -> Result<PathBuf> {
        // pdftoppm -singlefile appends the extension itself.
        let suffix = format!(".{}", req.format.extension());
        let output = req
            .output
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF8 output path not supported"))?;
        let prefix = output.strip_suffix(&suffix).ok_or_else(|| {
            anyhow!("output path must end with {suffix}: {}", req.output.display())
        })?;

        debug!(
            "pdftoppm page={} dpi={} input={}",
            req.page,
            req.dpi,
            req.input.display()
        );
        let out = Command::new(&self.pdftoppm_exe)
            .arg(req.format.pdftoppm_flag())
            .arg("-r")
            .arg(req.dpi.to_string())
            .arg("-f")
            .arg(req.page.to_string())
            .arg("-l")
            .arg(req.page.to_string())
            .arg("-singlefile")
            .arg(&req.input)
            .arg(prefix)
            .output()
            .with_context(|| {
                format!("failed to invoke {}; is poppler-utils installed?", self.pdftoppm_exe)
            })?;

        if !out.status.success() {
            return Err(anyhow!(
                "{} failed on page {}: {}",
                self.pdftoppm_exe,
                req.page,
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        if !req.output.exists() {
            return Err(anyhow!(
                "expected rendered image not found: {}",
                req.output.display()
            ));
        }
        Ok(req.output.clone())
    }
}

pub fn parse_page_count(pdfinfo_stdout: &str) -> Option<u32> {
    let re = Regex::new(r"(?m)^Pages:\s+(\d+)").ok()?;
    re.captures(pdfinfo_stdout)?.get(1)?.as_str().parse().ok()
}

pub fn parse_version(banner: &str) -> Option<String> {
    let re = Regex::new(r"version\s+(\S+)").ok()?;
    Some(re.captures(banner)?.get(1)?.as_str().to_string())
}
