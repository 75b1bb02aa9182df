//! Pipeline-side completion notifier.
//!
//! After a successful store, the pipeline calls the originating gateway's
//! fulfill endpoint with the correlation id in the path. The gateway looks
//! up the push channel and delivers the terminal event.

use async_trait::async_trait;
use tracing::{debug, info};

use chiffre_core::config::NotifyConfig;

/// Errors that can occur while triggering the fulfill endpoint.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {0}")]
    Rejected(u16),
}

/// Seam for the notification step; HTTP in production, stubbed in tests.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Trigger the gateway's fulfill endpoint for `correlation_id`.
    async fn notify(&self, correlation_id: &str) -> Result<(), NotifyError>;
}

/// Calls `GET {gateway}/api/notification/{id}`.
pub struct HttpCompletionNotifier {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpCompletionNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: config.gateway_url.clone(),
        }
    }
}

#[async_trait]
impl CompletionNotifier for HttpCompletionNotifier {
    async fn notify(&self, correlation_id: &str) -> Result<(), NotifyError> {
        let url = format!(
            "{}/api/notification/{}",
            self.gateway_url.trim_end_matches('/'),
            correlation_id
        );
        debug!(url = %url, "Triggering fulfill endpoint");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        info!(correlation_id, "Fulfill endpoint notified");
        Ok(())
    }
}
