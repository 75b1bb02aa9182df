//! Pipeline error types.

use thiserror::Error;

use chiffre_blob::BlobError;
use chiffre_notify::NotifyError;
use chiffre_queue::QueueError;
use chiffre_worker::WorkerError;

use crate::consumer::JobStage;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("worker leg failed at {stage}: {source}")]
    Worker {
        stage: JobStage,
        #[source]
        source: WorkerError,
    },

    #[error("blob store failed: {0}")]
    Blob(#[from] BlobError),

    #[error("locator does not embed a correlation id: {0}")]
    LocatorMissingId(String),

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),
}
