use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub peer: PeerConfig,
    pub blob: BlobConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            aws: AwsConfig::from_env(),
            queue: QueueConfig::from_env(),
            worker: WorkerConfig::from_env(),
            peer: PeerConfig::from_env(),
            blob: BlobConfig::from_env(),
            notify: NotifyConfig::from_env(),
        }
    }
}

// ── Gateway server ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted upload size in megabytes.
    pub max_upload_mb: u64,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("CHIFFRE_HOST", "0.0.0.0"),
            port: env_u16("CHIFFRE_PORT", 8080),
            max_upload_mb: env_u64("CHIFFRE_MAX_UPLOAD_MB", 25),
        }
    }
}

// ── AWS credentials / endpoint ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Explicit endpoint override (LocalStack / elasticmq in dev).
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env() -> Self {
        Self {
            region: env_or("AWS_REGION", "eu-central-1"),
            access_key_id: env_opt("AWS_ACCESS_KEY_ID"),
            secret_access_key: env_opt("AWS_SECRET_ACCESS_KEY"),
            session_token: env_opt("AWS_SESSION_TOKEN"),
            endpoint_url: env_opt("QUEUE_AWS_ENDPOINT_URL"),
        }
    }
}

// ── Job queue ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub queue_url: String,
    pub dlq_url: Option<String>,
    /// Seconds a dequeued message stays invisible before redelivery.
    pub visibility_timeout_secs: u32,
    /// Receive count beyond which a failing message is dropped to the
    /// broker's redrive policy instead of being nacked again.
    pub max_attempts: u32,
    pub poll_batch_size: u32,
}

impl QueueConfig {
    fn from_env() -> Self {
        Self {
            queue_url: env_or("QUEUE_URL", ""),
            dlq_url: env_opt("QUEUE_DLQ_URL"),
            visibility_timeout_secs: env_u32("QUEUE_VISIBILITY_TIMEOUT_SECS", 120),
            max_attempts: env_u32("QUEUE_MAX_ATTEMPTS", 3),
            poll_batch_size: env_u32("QUEUE_POLL_BATCH_SIZE", 5),
        }
    }
}

// ── Subprocess transform ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Path to the external cipher executable.
    pub cipher_bin: PathBuf,
    /// Scratch directory for temp input/output staging.
    pub scratch_dir: PathBuf,
    /// Wall-clock budget for one subprocess run.
    pub timeout_secs: u64,
    /// Upper bound on concurrently running cipher subprocesses.
    pub max_concurrent: usize,
}

impl WorkerConfig {
    fn from_env() -> Self {
        Self {
            cipher_bin: PathBuf::from(env_or("CIPHER_BIN", "/usr/local/bin/cipher")),
            scratch_dir: PathBuf::from(env_or("CIPHER_SCRATCH_DIR", "/tmp/chiffre")),
            timeout_secs: env_u64("CIPHER_TIMEOUT_SECS", 60),
            max_concurrent: env_u64("CIPHER_MAX_CONCURRENT", 4) as usize,
        }
    }
}

// ── Remote peer ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Full URL of the peer node's transform endpoint.
    pub transform_url: String,
    pub request_timeout_secs: u64,
}

impl PeerConfig {
    fn from_env() -> Self {
        Self {
            transform_url: env_or("PEER_TRANSFORM_URL", "http://localhost:8084/transform"),
            request_timeout_secs: env_u64("PEER_REQUEST_TIMEOUT_SECS", 90),
        }
    }
}

// ── Blob store ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Base URL of the blob service API (POST target).
    pub api_url: String,
    /// Base URL callers use to download stored blobs. Defaults to `api_url`
    /// when the service is reachable under one address.
    pub public_url: String,
}

impl BlobConfig {
    fn from_env() -> Self {
        let api_url = env_or("BLOB_API_URL", "http://localhost:3001");
        let public_url = env_or("BLOB_PUBLIC_URL", &api_url);
        Self { api_url, public_url }
    }
}

// ── Notification push ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Base URL of the gateway hosting the fulfill endpoint.
    pub gateway_url: String,
    /// Seconds an unfulfilled subscription may stay open before the reap
    /// sweep closes it with a timeout event.
    pub subscription_ttl_secs: u64,
    pub reap_interval_secs: u64,
}

impl NotifyConfig {
    fn from_env() -> Self {
        Self {
            gateway_url: env_or("GATEWAY_URL", "http://localhost:8080"),
            subscription_ttl_secs: env_u64("SSE_SUBSCRIPTION_TTL_SECS", 600),
            reap_interval_secs: env_u64("SSE_REAP_INTERVAL_SECS", 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Only assert keys unlikely to be set in a test environment.
        let worker = WorkerConfig::from_env();
        assert_eq!(worker.timeout_secs, 60);
        assert!(worker.max_concurrent >= 1);

        let queue = QueueConfig::from_env();
        assert_eq!(queue.max_attempts, 3);

        let notify = NotifyConfig::from_env();
        assert_eq!(notify.reap_interval_secs, 30);
    }
}
