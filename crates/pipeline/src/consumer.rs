//! Per-job orchestration: dispatch both transform legs, join, persist,
//! notify.
//!
//! One `JobConsumer` instance processes one dequeued job fully before the
//! runner hands it the next; cross-job parallelism belongs to the broker
//! delivering to multiple worker instances.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::{debug, info, warn};
use uuid::Uuid;

use chiffre_blob::{extract_correlation_id, BlobStore};
use chiffre_core::Job;
use chiffre_notify::CompletionNotifier;
use chiffre_worker::{combine, run_both, Transform};

use crate::error::PipelineError;

/// Stage a job passes through; every transition is traced. `Failed` is the
/// absorbing state reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Dispatched,
    Joined,
    Combined,
    Stored,
    Notified,
    Complete,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStage::Received => "received",
            JobStage::Dispatched => "dispatched",
            JobStage::Joined => "joined",
            JobStage::Combined => "combined",
            JobStage::Stored => "stored",
            JobStage::Notified => "notified",
            JobStage::Complete => "complete",
            JobStage::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// How a processed job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Full run: stored under `locator`, subscriber notified.
    Completed { locator: String },
    /// Empty payload, a valid no-op, short-circuited before dispatch.
    SkippedEmpty,
    /// Correlation id already processed; at-least-once redelivery suppressed.
    SkippedDuplicate,
}

/// Orchestrates one job end to end against the injected seams.
pub struct JobConsumer {
    local: Arc<dyn Transform>,
    remote: Arc<dyn Transform>,
    blob: Arc<dyn BlobStore>,
    notifier: Arc<dyn CompletionNotifier>,
    /// Correlation ids of recently completed jobs. Only successful (or
    /// no-op) runs are recorded so a nacked failure can still be retried.
    completed: Mutex<LruCache<Uuid, ()>>,
}

/// How many completed correlation ids the duplicate filter remembers.
const DEDUP_CAPACITY: usize = 1024;

impl JobConsumer {
    pub fn new(
        local: Arc<dyn Transform>,
        remote: Arc<dyn Transform>,
        blob: Arc<dyn BlobStore>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        Self {
            local,
            remote,
            blob,
            notifier,
            completed: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEDUP_CAPACITY).unwrap(),
            )),
        }
    }

    fn advance(job: &Job, from: JobStage, to: JobStage) -> JobStage {
        debug!(
            correlation_id = %job.correlation_id,
            from = %from,
            to = %to,
            "Job stage transition"
        );
        to
    }

    /// Process one job through the full state machine.
    ///
    /// Joined is reached only when both legs resolve; either leg failing
    /// moves the job to Failed without persisting anything. Exactly one
    /// notification attempt happens per job, on the success path only; a
    /// failed job is logged, not retried here, and notification is skipped
    /// (the caller only ever learns by the event never arriving).
    pub async fn process_job(&self, job: Job) -> Result<JobOutcome, PipelineError> {
        let mut stage = JobStage::Received;
        info!(
            correlation_id = %job.correlation_id,
            file_name = %job.file_name,
            payload_len = job.payload.len(),
            mode = %job.mode,
            operation = %job.operation,
            "Job received"
        );

        if self
            .completed
            .lock()
            .unwrap()
            .contains(&job.correlation_id)
        {
            warn!(
                correlation_id = %job.correlation_id,
                "Duplicate delivery of a completed job, skipping"
            );
            return Ok(JobOutcome::SkippedDuplicate);
        }

        // An empty payload is a valid no-op job.
        if job.payload.is_empty() {
            info!(correlation_id = %job.correlation_id, "Empty payload, no-op job");
            self.completed.lock().unwrap().put(job.correlation_id, ());
            return Ok(JobOutcome::SkippedEmpty);
        }

        stage = Self::advance(&job, stage, JobStage::Dispatched);
        let (local_result, remote_result) =
            run_both(self.local.as_ref(), self.remote.as_ref(), &job)
                .await
                .map_err(|source| {
                    warn!(
                        correlation_id = %job.correlation_id,
                        stage = %stage,
                        error = %source,
                        "Transform leg failed, job moves to failed, nothing persisted"
                    );
                    PipelineError::Worker { stage, source }
                })?;
        stage = Self::advance(&job, stage, JobStage::Joined);

        let combined = combine(local_result, remote_result, &job);
        stage = Self::advance(&job, stage, JobStage::Combined);

        let locator = self
            .blob
            .store(&combined.bytes, &combined.file_name, combined.correlation_id)
            .await?;
        stage = Self::advance(&job, stage, JobStage::Stored);

        // The locator, not our own job record, is the notification source:
        // the id must be recoverable from its text (contract with the blob
        // service).
        let id = extract_correlation_id(&locator)
            .ok_or_else(|| PipelineError::LocatorMissingId(locator.clone()))?
            .to_string();

        self.notifier.notify(&id).await?;
        stage = Self::advance(&job, stage, JobStage::Notified);

        self.completed.lock().unwrap().put(job.correlation_id, ());
        Self::advance(&job, stage, JobStage::Complete);
        info!(
            correlation_id = %job.correlation_id,
            combined_len = combined.bytes.len(),
            "Job complete"
        );

        Ok(JobOutcome::Completed { locator })
    }
}
