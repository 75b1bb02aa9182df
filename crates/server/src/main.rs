//! chiffre-server: ingestion gateway and push-notification host.
//!
//! Accepts cipher job submissions, publishes them to the job queue, and
//! serves the correlation-keyed SSE channel the pipeline fulfills once a
//! job's output is stored.

mod api;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use chiffre_notify::NotificationRegistry;
use chiffre_queue::SqsQueue;

use crate::state::AppState;

/// Periodically close subscriptions that outlived their TTL.
fn spawn_reaper(registry: Arc<NotificationRegistry>, ttl: Duration, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let reaped = registry.reap(ttl);
            if reaped > 0 {
                info!(reaped, "Reaped expired push subscriptions");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    chiffre_core::config::load_dotenv();
    let config = chiffre_core::Config::from_env();

    let publisher = Arc::new(SqsQueue::new(&config.aws, &config.queue).await?);
    let registry = Arc::new(NotificationRegistry::new());

    spawn_reaper(
        registry.clone(),
        Duration::from_secs(config.notify.subscription_ttl_secs),
        Duration::from_secs(config.notify.reap_interval_secs),
    );

    let state = Arc::new(AppState {
        registry,
        publisher,
        blob_public_url: config.blob.public_url.clone(),
    });

    let app = router::build_router(state, config.server.max_upload_mb);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(addr = %addr, "Gateway listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
