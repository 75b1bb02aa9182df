//! pipeline-worker: consumes jobs from the queue and runs the fan-out/
//! fan-in transform pipeline.
//!
//! Per job: dispatch the subprocess and remote transform legs in parallel,
//! join under the concatenation policy, persist to the blob service, and
//! trigger the gateway's fulfill endpoint with the correlation id.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use chiffre_blob::HttpBlobStore;
use chiffre_core::Config;
use chiffre_notify::HttpCompletionNotifier;
use chiffre_pipeline::{run_consumer_loop, JobConsumer};
use chiffre_queue::{QueueConsumer, SqsQueue};
use chiffre_worker::{RemoteTransform, SubprocessTransform};

// ── CLI ─────────────────────────────────────────────────────────────

/// Chiffre pipeline worker: fan-out/fan-in cipher job consumer.
#[derive(Parser, Debug)]
#[command(name = "pipeline-worker", version, about)]
struct Cli {
    /// Override the cipher executable path from CIPHER_BIN.
    #[arg(long, env = "CIPHER_BIN")]
    cipher_bin: Option<String>,

    /// Override the queue URL from QUEUE_URL.
    #[arg(long, env = "QUEUE_URL")]
    queue_url: Option<String>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    chiffre_core::config::load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(bin) = cli.cipher_bin {
        config.worker.cipher_bin = bin.into();
    }
    if let Some(url) = cli.queue_url {
        config.queue.queue_url = url;
    }

    info!(
        cipher_bin = %config.worker.cipher_bin.display(),
        queue_url = %config.queue.queue_url,
        peer = %config.peer.transform_url,
        blob = %config.blob.api_url,
        gateway = %config.notify.gateway_url,
        "Starting pipeline worker"
    );

    let queue = Arc::new(SqsQueue::new(&config.aws, &config.queue).await?);

    let health = queue.health_check().await?;
    info!(%health, "Queue reachable");

    let consumer = Arc::new(JobConsumer::new(
        Arc::new(SubprocessTransform::new(&config.worker)),
        Arc::new(RemoteTransform::new(&config.peer)?),
        Arc::new(HttpBlobStore::new(&config.blob)),
        Arc::new(HttpCompletionNotifier::new(&config.notify)),
    ));

    run_consumer_loop(queue, consumer, &config.queue).await;

    Ok(())
}
