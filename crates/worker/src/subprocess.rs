//! Subprocess-backed transform.
//!
//! Stages the payload into a temp file, runs the external cipher executable
//! with positional arguments, drains both output streams while it runs,
//! enforces a wall-clock timeout, and cleans up staging files on every exit
//! path.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chiffre_core::config::WorkerConfig;
use chiffre_core::{Job, WorkerResult};

use crate::error::WorkerError;
use crate::transform::Transform;

/// Deletes both staging files when the transform returns, regardless of
/// which path it took (success, failure, timeout).
struct ScratchPair {
    input: PathBuf,
    output: PathBuf,
}

impl Drop for ScratchPair {
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to delete scratch file");
                }
            }
        }
    }
}

/// Runs the transform via the external cipher executable.
///
/// Invocation contract (positional): `<bin> <input> <key> <output> <operation> <mode>`.
/// Concurrency is bounded by a semaphore so a burst of jobs cannot fork an
/// unbounded number of cipher processes.
pub struct SubprocessTransform {
    bin: PathBuf,
    scratch_dir: PathBuf,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl SubprocessTransform {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            bin: config.cipher_bin.clone(),
            scratch_dir: config.scratch_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    /// Test/override constructor with explicit paths and timeout.
    pub fn with_paths(bin: &Path, scratch_dir: &Path, timeout: Duration) -> Self {
        Self {
            bin: bin.to_path_buf(),
            scratch_dir: scratch_dir.to_path_buf(),
            timeout,
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Stage the payload and reserve a unique output path.
    fn stage(&self, job: &Job) -> Result<ScratchPair, WorkerError> {
        std::fs::create_dir_all(&self.scratch_dir)?;

        let token = Uuid::new_v4();
        let pair = ScratchPair {
            input: self.scratch_dir.join(format!("input_{token}.bin")),
            output: self.scratch_dir.join(format!("output_{token}.bin")),
        };
        std::fs::write(&pair.input, &job.payload)?;
        debug!(input = %pair.input.display(), "Staged payload");

        Ok(pair)
    }
}

#[async_trait]
impl Transform for SubprocessTransform {
    async fn execute(&self, job: &Job) -> Result<WorkerResult, WorkerError> {
        // Closed semaphore is impossible here; treat it as a spawn failure.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| WorkerError::Spawn(format!("worker pool closed: {e}")))?;

        let stage = self.stage(job)?;

        let mut child = Command::new(&self.bin)
            .arg(&stage.input)
            .arg(&job.key)
            .arg(&stage.output)
            .arg(job.operation.to_string())
            .arg(job.mode.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Spawn(format!("{}: {e}", self.bin.display())))?;

        // Drain both streams while the child runs. A child that fills either
        // pipe buffer blocks forever if nobody reads it.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let drain_stdout = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let drain_stderr = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(wait_result) => wait_result?,
            Err(_) => {
                warn!(
                    correlation_id = %job.correlation_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Cipher process timed out, killing"
                );
                child.kill().await.ok();
                drain_stdout.abort();
                drain_stderr.abort();
                return Err(WorkerError::Timeout(self.timeout));
            }
        };

        let stdout = drain_stdout.await.unwrap_or_default();
        let stderr = drain_stderr.await.unwrap_or_default();
        if !stdout.is_empty() {
            debug!(
                correlation_id = %job.correlation_id,
                "Cipher stdout: {}",
                String::from_utf8_lossy(&stdout).trim_end()
            );
        }

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(WorkerError::NonZeroExit {
                code,
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            });
        }

        // Exit 0 without a non-empty output file is still a failure.
        let meta = std::fs::metadata(&stage.output);
        match meta {
            Ok(m) if m.len() > 0 => {}
            _ => return Err(WorkerError::OutputMissing(stage.output.clone())),
        }

        let bytes = std::fs::read(&stage.output)?;
        info!(
            correlation_id = %job.correlation_id,
            output_len = bytes.len(),
            "Subprocess transform complete"
        );

        let diagnostic = if stderr.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&stderr).trim_end().to_string())
        };

        Ok(WorkerResult {
            bytes,
            source: "subprocess",
            diagnostic,
        })
        // `stage` drops here, deleting both temp files.
    }

    fn name(&self) -> &'static str {
        "subprocess"
    }
}
