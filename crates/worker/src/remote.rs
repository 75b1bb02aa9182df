//! Remote-peer transform leg.
//!
//! Ships the full job (payload and cipher parameters) to a peer node over
//! HTTP; the peer's response body is the raw transformed bytes. Failures
//! are not recovered locally; they abort the whole job upstream.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use chiffre_core::config::PeerConfig;
use chiffre_core::{Job, WorkerResult};

use crate::error::WorkerError;
use crate::transform::Transform;

/// Transform leg that delegates to a peer node's `/transform` endpoint.
pub struct RemoteTransform {
    client: reqwest::Client,
    transform_url: String,
}

impl RemoteTransform {
    pub fn new(peer: &PeerConfig) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(peer.request_timeout_secs))
            .build()
            .map_err(|e| WorkerError::Remote(format!("client build failed: {e}")))?;

        Ok(Self {
            client,
            transform_url: peer.transform_url.clone(),
        })
    }

    /// Test constructor with an explicit URL and default client.
    pub fn with_url(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            transform_url: url.to_string(),
        }
    }
}

#[async_trait]
impl Transform for RemoteTransform {
    async fn execute(&self, job: &Job) -> Result<WorkerResult, WorkerError> {
        debug!(
            correlation_id = %job.correlation_id,
            url = %self.transform_url,
            payload_len = job.payload.len(),
            "Dispatching remote transform"
        );

        let resp = self
            .client
            .post(&self.transform_url)
            .json(job)
            .send()
            .await
            .map_err(|e| WorkerError::Remote(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WorkerError::Remote(format!(
                "peer returned {status} for {}",
                job.correlation_id
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| WorkerError::Remote(format!("body read failed: {e}")))?;

        info!(
            correlation_id = %job.correlation_id,
            output_len = bytes.len(),
            "Remote transform complete"
        );

        Ok(WorkerResult {
            bytes: bytes.to_vec(),
            source: "remote",
            diagnostic: None,
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
