//! The polymorphic transform capability both worker legs implement.

use async_trait::async_trait;

use chiffre_core::{Job, WorkerResult};

use crate::error::WorkerError;

/// One transform leg: takes the full job, returns transformed bytes.
///
/// The combiner joins two implementations without caring which is the
/// local subprocess and which is the remote peer.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<WorkerResult, WorkerError>;

    /// Human-readable leg name for logs ("subprocess", "remote").
    fn name(&self) -> &'static str;
}
