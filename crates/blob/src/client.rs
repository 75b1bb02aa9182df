//! Blob store client.
//!
//! Persists combined pipeline output to the external blob service and
//! returns the opaque locator the service responds with. The locator must
//! embed the correlation id (see [`crate::locator`]).

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use chiffre_core::config::BlobConfig;

use crate::error::BlobError;

/// Persistence seam for the pipeline. One real HTTP implementation; tests
/// stub this trait to observe store calls.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `file_name`, keyed by `correlation_id`.
    /// Returns the service's opaque locator string.
    async fn store(
        &self,
        bytes: &[u8],
        file_name: &str,
        correlation_id: Uuid,
    ) -> Result<String, BlobError>;
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    file_name: &'a str,
    content_type: &'a str,
    uuid: String,
    /// Hex-encoded payload; the blob service decodes before persisting.
    data: String,
}

/// HTTP client for the blob service's POST endpoint.
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBlobStore {
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn store(
        &self,
        bytes: &[u8],
        file_name: &str,
        correlation_id: Uuid,
    ) -> Result<String, BlobError> {
        let url = format!("{}/api/blobs", self.api_url.trim_end_matches('/'));
        let request = StoreRequest {
            file_name,
            content_type: "application/octet-stream",
            uuid: correlation_id.to_string(),
            data: hex::encode(bytes),
        };

        debug!(
            correlation_id = %correlation_id,
            url = %url,
            len = bytes.len(),
            "Storing blob"
        );

        let resp = self.client.post(&url).json(&request).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BlobError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            correlation_id = %correlation_id,
            len = bytes.len(),
            "Blob stored"
        );

        Ok(body)
    }
}
