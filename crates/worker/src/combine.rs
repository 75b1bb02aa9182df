//! Strict fan-in of the two transform legs.
//!
//! Both legs must resolve before anything downstream runs; the first leg to
//! fail aborts the join and drops (cancels) the remaining future. There is
//! no partial-success path.

use tracing::debug;

use chiffre_core::{CombinedResult, Job, WorkerResult};

use crate::error::WorkerError;
use crate::transform::Transform;

/// Run both transform legs concurrently and wait for both.
///
/// Returns `(subprocess_result, remote_result)` in dispatch order. The
/// first error cancels the other leg and propagates.
pub async fn run_both(
    local: &dyn Transform,
    remote: &dyn Transform,
    job: &Job,
) -> Result<(WorkerResult, WorkerResult), WorkerError> {
    tokio::try_join!(local.execute(job), remote.execute(job))
}

/// Join two worker results under the fixed combine policy: byte
/// concatenation, local (subprocess) leg first, then the remote leg.
pub fn combine(local: WorkerResult, remote: WorkerResult, job: &Job) -> CombinedResult {
    let mut bytes = Vec::with_capacity(local.bytes.len() + remote.bytes.len());
    bytes.extend_from_slice(&local.bytes);
    bytes.extend_from_slice(&remote.bytes);

    debug!(
        correlation_id = %job.correlation_id,
        local_len = local.bytes.len(),
        remote_len = remote.bytes.len(),
        combined_len = bytes.len(),
        "Combined worker results"
    );

    CombinedResult {
        bytes,
        file_name: job.file_name.clone(),
        correlation_id: job.correlation_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chiffre_core::{CipherMode, CipherOperation};
    use std::time::Duration;

    struct FixedTransform {
        bytes: Vec<u8>,
        source: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Transform for FixedTransform {
        async fn execute(&self, _job: &Job) -> Result<WorkerResult, WorkerError> {
            tokio::time::sleep(self.delay).await;
            Ok(WorkerResult {
                bytes: self.bytes.clone(),
                source: self.source,
                diagnostic: None,
            })
        }

        fn name(&self) -> &'static str {
            self.source
        }
    }

    struct FailingTransform;

    #[async_trait]
    impl Transform for FailingTransform {
        async fn execute(&self, _job: &Job) -> Result<WorkerResult, WorkerError> {
            Err(WorkerError::Remote("connection refused".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn test_job() -> Job {
        Job::new(
            b"0123456789".to_vec(),
            "in.bmp".to_string(),
            CipherMode::Cbc,
            CipherOperation::Encrypt,
            "k".to_string(),
        )
    }

    /// Regression pin for the combine policy: the result is the full
    /// concatenation of both legs, not just the first leg forwarded.
    #[tokio::test]
    async fn test_combine_is_concatenation_local_first() {
        let local = FixedTransform {
            bytes: b"AAAAA".to_vec(),
            source: "subprocess",
            delay: Duration::ZERO,
        };
        let remote = FixedTransform {
            bytes: b"BBBBB".to_vec(),
            source: "remote",
            delay: Duration::ZERO,
        };
        let job = test_job();

        let (a, b) = run_both(&local, &remote, &job).await.unwrap();
        let combined = combine(a, b, &job);

        assert_eq!(combined.bytes.len(), 10);
        assert_eq!(combined.bytes, b"AAAAABBBBB");
        assert_eq!(combined.file_name, "in.bmp");
        assert_eq!(combined.correlation_id, job.correlation_id);
    }

    #[tokio::test]
    async fn test_join_waits_for_slower_leg() {
        let local = FixedTransform {
            bytes: b"A".to_vec(),
            source: "subprocess",
            delay: Duration::from_millis(50),
        };
        let remote = FixedTransform {
            bytes: b"B".to_vec(),
            source: "remote",
            delay: Duration::ZERO,
        };
        let job = test_job();

        // Strict join, not a race: both results present even though the
        // remote leg finished first.
        let (a, b) = run_both(&local, &remote, &job).await.unwrap();
        assert_eq!(a.bytes, b"A");
        assert_eq!(b.bytes, b"B");
    }

    #[tokio::test]
    async fn test_one_leg_failing_aborts_the_join_quickly() {
        let slow = FixedTransform {
            bytes: b"A".to_vec(),
            source: "subprocess",
            delay: Duration::from_secs(30),
        };
        let job = test_job();

        let started = std::time::Instant::now();
        let err = run_both(&slow, &FailingTransform, &job).await.unwrap_err();

        assert!(matches!(err, WorkerError::Remote(_)));
        // The failure must cancel the slow leg rather than wait it out.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_empty_legs_combine_to_empty() {
        let job = test_job();
        let a = WorkerResult {
            bytes: Vec::new(),
            source: "subprocess",
            diagnostic: None,
        };
        let b = WorkerResult {
            bytes: Vec::new(),
            source: "remote",
            diagnostic: None,
        };
        assert!(combine(a, b, &job).bytes.is_empty());
    }
}
