//! Queue publisher trait: the gateway side of the job queue.

use async_trait::async_trait;

use chiffre_core::Job;

use crate::error::QueueError;

/// Trait for publishing jobs onto the durable queue.
///
/// The gateway publishes and detaches; it never waits for processing.
/// Returns the provider's message id for log correlation.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, job: &Job) -> Result<String, QueueError>;
}
