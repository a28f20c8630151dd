use super::{types::*, Detector};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Detector hosted by `detector_runner.py`, one JSON request per process.
pub struct PythonDetector {
    cfg: Config,
    runner: PathBuf,
    python_exe: PathBuf,
}

impl PythonDetector {
    pub fn new(cfg: &Config) -> Result<Self> {
        let runner = runner_path(cfg);
        if !runner.exists() {
            return Err(anyhow!("missing script: {}", runner.display()));
        }
        let python_exe = resolve_python_exe(&cfg.detector.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            runner,
            python_exe,
        })
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
        timeout_seconds: Option<u64>,
        stream_stderr: bool,
    ) -> Result<O> {
        debug!(
            "python run {} timeout={:?}",
            self.runner.display(),
            timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.runner);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        // Training progress is only useful live, so let it through to the terminal.
        cmd.stderr(if stream_stderr {
            Stdio::inherit()
        } else {
            Stdio::piped()
        });

        for (k, v) in &self.cfg.detector.env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "spawning python ({}): {}",
                self.python_exe.display(),
                self.runner.display()
            )
        })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            stdin.write_all(&bytes)?;
            stdin.flush().ok();
        }

        let output = match timeout_seconds {
            Some(secs) if secs > 0 => wait_with_timeout(&mut child, Duration::from_secs(secs))?,
            _ => child
                .wait_with_output()
                .with_context(|| "waiting for python")?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "detector runner failed ({}): {}\n{}",
                output.status,
                self.runner.display(),
                stderr.trim()
            ));
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr: {}", stderr.trim());
        }

        let out: O = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing runner JSON output: {}", self.runner.display()))?;
        Ok(out)
    }

    fn doctor_timeout(&self) -> Option<u64> {
        Some(self.cfg.detector.doctor_timeout_seconds)
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("TAKEOFF_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        for venv in [".venv/bin/python", "takeoff_mvp/bin/python"] {
            let p = PathBuf::from(venv);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl Detector for PythonDetector {
    fn doctor(&self) -> Result<DetectorDiag> {
        self.run_json(
            &serde_json::json!({"cmd": "doctor", "modules": &self.cfg.detector.modules}),
            self.doctor_timeout(),
            false,
        )
    }

    fn model_info(&self, checkpoint: &str) -> Result<ModelInfo> {
        let out: ModelInfo = self.run_json(
            &serde_json::json!({"cmd": "info", "checkpoint": checkpoint}),
            self.doctor_timeout(),
            false,
        )?;
        if let Some(err) = out.error.as_deref() {
            return Err(anyhow!("loading model {checkpoint}: {err}"));
        }
        Ok(out)
    }

    fn train(&self, req: &TrainIn) -> Result<TrainOut> {
        let out: TrainOut =
            self.run_json(&serde_json::json!({"cmd": "train", "req": req}), None, true)?;
        if !out.ok {
            let msg = out.error.unwrap_or_else(|| "training failed".to_string());
            return Err(anyhow!(msg));
        }
        Ok(out)
    }

    fn predict(&self, req: &PredictIn) -> Result<Vec<ImagePrediction>> {
        let timeout = Some(self.cfg.detector.predict_timeout_seconds);
        let out: PredictOut =
            self.run_json(&serde_json::json!({"cmd": "predict", "req": req}), timeout, false)?;
        if let Some(err) = out.error {
            return Err(anyhow!("predict failed: {err}"));
        }
        if out.results.len() < req.images.len() && !req.stop_on_error {
            warn!(
                "runner returned {} results for {} images",
                out.results.len(),
                req.images.len()
            );
        }
        Ok(out.results)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain both pipes while polling; a chatty runner would otherwise block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            break (status, false);
        }
        if start.elapsed() > timeout {
            warn!("detector runner timed out after {:?}", timeout);
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            break (status, true);
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    let stdout = stdout_thread
        .join()
        .map_err(|_| anyhow!("stdout reader thread panicked"))??;
    let stderr = stderr_thread
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))??;

    if timed_out {
        return Err(anyhow!(
            "detector runner exceeded timeout ({:?}); stderr: {}",
            timeout,
            String::from_utf8_lossy(&stderr)
        ));
    }
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

pub fn runner_path(cfg: &Config) -> PathBuf {
    Path::new(&cfg.paths.scripts_dir).join(&cfg.detector.runner_script)
}
