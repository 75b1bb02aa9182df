//! Transform worker error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn cipher process: {0}")]
    Spawn(String),

    #[error("cipher process timed out after {0:?}")]
    Timeout(Duration),

    #[error("cipher process exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("cipher process exited 0 but output file is missing or empty: {0}")]
    OutputMissing(PathBuf),

    #[error("remote transform failed: {0}")]
    Remote(String),
}
