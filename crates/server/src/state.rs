use std::sync::Arc;

use chiffre_notify::NotificationRegistry;
use chiffre_queue::QueuePublisher;

pub struct AppState {
    /// Correlation id → open push channel.
    pub registry: Arc<NotificationRegistry>,
    /// Job queue publish side (fire-and-forget from the gateway).
    pub publisher: Arc<dyn QueuePublisher>,
    /// Base URL callers use to download stored blobs.
    pub blob_public_url: String,
}
