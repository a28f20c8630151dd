use crate::{
    config::Config,
    engine::{DependencyCheck, Detector, Rasterizer},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeTest {
    pub checkpoint: String,
    pub ok: bool,
    #[serde(default)]
    pub classes: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    #[serde(default)]
    pub python_exe: Option<String>,
    #[serde(default)]
    pub python_version: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    pub checks: Vec<DependencyCheck>,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub smoke_test: Option<SmokeTest>,
}

impl DoctorReport {
    pub fn ok(&self) -> bool {
        self.failed == 0 && self.smoke_test.as_ref().is_none_or(|s| s.ok)
    }
}

/// Every check runs regardless of earlier failures. The model smoke test only
/// runs once all dependency checks passed.
pub fn check_environment<R: Rasterizer, D: Detector>(
    cfg: &Config,
    rasterizer: &R,
    detector: Result<D>,
) -> DoctorReport {
    let mut report = DoctorReport {
        python_exe: None,
        python_version: None,
        device: None,
        checks: rasterizer.doctor(),
        passed: 0,
        failed: 0,
        smoke_test: None,
    };

    let detector = match detector {
        Ok(d) => match d.doctor() {
            Ok(diag) => {
                report.python_exe = Some(diag.python_exe);
                report.python_version = Some(diag.python_version);
                report.device = diag.device;
                report.checks.extend(diag.checks);
                Some(d)
            }
            Err(err) => {
                report
                    .checks
                    .push(DependencyCheck::failed("detector runner", format!("{err:#}")));
                None
            }
        },
        Err(err) => {
            report
                .checks
                .push(DependencyCheck::failed("detector runner", format!("{err:#}")));
            None
        }
    };

    for check in &report.checks {
        if check.ok {
            info!(
                "ok   {} {}",
                check.name,
                check.version.as_deref().unwrap_or("")
            );
        } else {
            error!(
                "FAIL {}: {}",
                check.name,
                check.detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
    report.passed = report.checks.iter().filter(|c| c.ok).count();
    report.failed = report.checks.len() - report.passed;

    if report.failed == 0 {
        if let Some(d) = detector {
            report.smoke_test = Some(smoke_test(&d, &cfg.train.base_checkpoint));
        }
    }

    report
}

fn smoke_test<D: Detector>(detector: &D, checkpoint: &str) -> SmokeTest {
    info!("loading {checkpoint} (first run may download it)");
    match detector.model_info(checkpoint) {
        Ok(model) => {
            info!("model loaded: {} classes", model.names.len());
            SmokeTest {
                checkpoint: checkpoint.to_string(),
                ok: true,
                classes: Some(model.names.len()),
                error: None,
            }
        }
        Err(err) => {
            error!("failed to load model: {err:#}");
            SmokeTest {
                checkpoint: checkpoint.to_string(),
                ok: false,
                classes: None,
                error: Some(format!("{err:#}")),
            }
        }
    }
}
