//! Long-poll consumption loop with ack/nack and max-attempts handling.

use std::sync::Arc;

use tracing::{error, info, warn};

use chiffre_core::config::QueueConfig;
use chiffre_queue::{parse_job, QueueConsumer, QueueMessage};

use crate::consumer::JobConsumer;

/// Poll the queue forever, processing one message at a time.
///
/// Ack on success, nack for redelivery on failure. A message that keeps
/// failing is acked out once its receive count reaches `max_attempts`; the
/// broker's redrive policy owns the actual dead-letter queue. Poison
/// messages (bodies that never parse) are acked out immediately; redelivery
/// cannot fix them.
pub async fn run_consumer_loop(
    queue: Arc<dyn QueueConsumer>,
    consumer: Arc<JobConsumer>,
    config: &QueueConfig,
) {
    info!(
        batch_size = config.poll_batch_size,
        max_attempts = config.max_attempts,
        "Consumer loop started"
    );

    loop {
        let messages = match queue.poll_batch(config.poll_batch_size).await {
            Ok(msgs) => msgs,
            Err(e) => {
                error!(error = %e, "Queue poll failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        for msg in messages {
            handle_message(queue.as_ref(), consumer.as_ref(), config, msg).await;
        }
    }
}

async fn handle_message(
    queue: &dyn QueueConsumer,
    consumer: &JobConsumer,
    config: &QueueConfig,
    msg: QueueMessage,
) {
    let job = match parse_job(&msg) {
        Ok(job) => job,
        Err(e) => {
            error!(
                message_id = %msg.id,
                error = %e,
                "Poison message, acking out"
            );
            if let Err(e) = queue.ack(&msg.receipt_handle).await {
                error!(message_id = %msg.id, error = %e, "Ack of poison message failed");
            }
            return;
        }
    };

    match consumer.process_job(job).await {
        Ok(outcome) => {
            info!(message_id = %msg.id, outcome = ?outcome, "Message processed");
            if let Err(e) = queue.ack(&msg.receipt_handle).await {
                error!(message_id = %msg.id, error = %e, "Ack failed");
            }
        }
        Err(e) if msg.attempt_count >= config.max_attempts => {
            error!(
                message_id = %msg.id,
                attempt = msg.attempt_count,
                error = %e,
                "Job failed at max attempts, dropping to redrive policy"
            );
            if let Err(e) = queue.ack(&msg.receipt_handle).await {
                error!(message_id = %msg.id, error = %e, "Final ack failed");
            }
        }
        Err(e) => {
            warn!(
                message_id = %msg.id,
                attempt = msg.attempt_count,
                error = %e,
                "Job failed, nacking for redelivery"
            );
            if let Err(e) = queue.nack(&msg.receipt_handle).await {
                error!(message_id = %msg.id, error = %e, "Nack failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chiffre_core::{CipherMode, CipherOperation, Job, WorkerResult};
    use chiffre_queue::{QueueError, QueueHealth};
    use chiffre_worker::{Transform, WorkerError};
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeQueue {
        acked: Mutex<Vec<String>>,
        nacked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueueConsumer for FakeQueue {
        async fn poll_batch(&self, _max: u32) -> Result<Vec<QueueMessage>, QueueError> {
            Ok(Vec::new())
        }

        async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
            self.acked.lock().unwrap().push(receipt_handle.to_string());
            Ok(())
        }

        async fn nack(&self, receipt_handle: &str) -> Result<(), QueueError> {
            self.nacked.lock().unwrap().push(receipt_handle.to_string());
            Ok(())
        }

        async fn health_check(&self) -> Result<QueueHealth, QueueError> {
            Ok(QueueHealth {
                connected: true,
                approximate_message_count: None,
                provider: "fake".to_string(),
            })
        }
    }

    struct StubTransform {
        fail: bool,
    }

    #[async_trait]
    impl Transform for StubTransform {
        async fn execute(&self, _job: &Job) -> Result<WorkerResult, WorkerError> {
            if self.fail {
                return Err(WorkerError::Remote("down".into()));
            }
            Ok(WorkerResult {
                bytes: b"X".to_vec(),
                source: "stub",
                diagnostic: None,
            })
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct OkBlobStore;

    #[async_trait]
    impl chiffre_blob::BlobStore for OkBlobStore {
        async fn store(
            &self,
            _: &[u8],
            _: &str,
            id: Uuid,
        ) -> Result<String, chiffre_blob::BlobError> {
            Ok(format!(r#"{{"uuid":"{id}"}}"#))
        }
    }

    struct OkNotifier;

    #[async_trait]
    impl chiffre_notify::CompletionNotifier for OkNotifier {
        async fn notify(&self, _: &str) -> Result<(), chiffre_notify::NotifyError> {
            Ok(())
        }
    }

    fn consumer(fail: bool) -> JobConsumer {
        JobConsumer::new(
            Arc::new(StubTransform { fail: false }),
            Arc::new(StubTransform { fail }),
            Arc::new(OkBlobStore),
            Arc::new(OkNotifier),
        )
    }

    fn message(attempt: u32, body: String) -> QueueMessage {
        QueueMessage {
            id: "m1".to_string(),
            body,
            receipt_handle: "rh1".to_string(),
            timestamp: Utc::now(),
            attempt_count: attempt,
        }
    }

    fn job_body() -> String {
        let job = Job::new(
            b"data".to_vec(),
            "f.bmp".to_string(),
            CipherMode::Ecb,
            CipherOperation::Encrypt,
            "k".to_string(),
        );
        serde_json::to_string(&job).unwrap()
    }

    fn test_config() -> QueueConfig {
        QueueConfig {
            queue_url: "http://fake/queue".to_string(),
            dlq_url: None,
            visibility_timeout_secs: 30,
            max_attempts: 3,
            poll_batch_size: 5,
        }
    }

    #[tokio::test]
    async fn test_success_acks() {
        let queue = FakeQueue::default();
        handle_message(&queue, &consumer(false), &test_config(), message(1, job_body())).await;

        assert_eq!(queue.acked.lock().unwrap().len(), 1);
        assert!(queue.nacked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_nacks_below_max_attempts() {
        let queue = FakeQueue::default();
        handle_message(&queue, &consumer(true), &test_config(), message(1, job_body())).await;

        assert!(queue.acked.lock().unwrap().is_empty());
        assert_eq!(queue.nacked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_at_max_attempts_acks_out() {
        let queue = FakeQueue::default();
        handle_message(&queue, &consumer(true), &test_config(), message(3, job_body())).await;

        assert_eq!(queue.acked.lock().unwrap().len(), 1);
        assert!(queue.nacked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poison_message_acked_immediately() {
        let queue = FakeQueue::default();
        handle_message(
            &queue,
            &consumer(false),
            &test_config(),
            message(1, "{broken".to_string()),
        )
        .await;

        assert_eq!(queue.acked.lock().unwrap().len(), 1);
        assert!(queue.nacked.lock().unwrap().is_empty());
    }
}
