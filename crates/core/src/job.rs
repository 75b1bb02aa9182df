//! Job record and cipher parameter types shared across the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Block cipher chaining mode passed through to the transform workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherMode {
    #[serde(rename = "ECB")]
    Ecb,
    #[serde(rename = "CBC")]
    Cbc,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Ecb => write!(f, "ECB"),
            CipherMode::Cbc => write!(f, "CBC"),
        }
    }
}

impl FromStr for CipherMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ECB" => Ok(CipherMode::Ecb),
            "CBC" => Ok(CipherMode::Cbc),
            other => Err(format!("unknown cipher mode: {other}")),
        }
    }
}

/// Direction of the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherOperation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for CipherOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherOperation::Encrypt => write!(f, "encrypt"),
            CipherOperation::Decrypt => write!(f, "decrypt"),
        }
    }
}

impl FromStr for CipherOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "encrypt" => Ok(CipherOperation::Encrypt),
            "decrypt" => Ok(CipherOperation::Decrypt),
            other => Err(format!("unknown cipher operation: {other}")),
        }
    }
}

/// One unit of work flowing from the gateway through the queue to the
/// pipeline consumer.
///
/// The correlation id is minted exactly once at ingestion and never reused;
/// it is the key the caller later uses to open its push subscription. An
/// empty payload is a valid no-op job; the consumer short-circuits it
/// before dispatching any worker.
#[derive(Clone, Serialize, Deserialize)]
pub struct Job {
    pub correlation_id: Uuid,
    /// Raw payload bytes, hex-encoded on the wire so queue messages and
    /// peer calls stay printable JSON.
    #[serde(with = "hex_payload")]
    pub payload: Vec<u8>,
    pub file_name: String,
    pub mode: CipherMode,
    pub operation: CipherOperation,
    pub key: String,
}

impl Job {
    pub fn new(
        payload: Vec<u8>,
        file_name: String,
        mode: CipherMode,
        operation: CipherOperation,
        key: String,
    ) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            payload,
            file_name,
            mode,
            operation,
            key,
        }
    }
}

// Manual Debug: the key is a secret and must never reach the logs.
impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("correlation_id", &self.correlation_id)
            .field("payload_len", &self.payload.len())
            .field("file_name", &self.file_name)
            .field("mode", &self.mode)
            .field("operation", &self.operation)
            .field("key", &"******")
            .finish()
    }
}

/// Output of a single transform leg. Ephemeral, produced per invocation
/// and consumed immediately by the combiner, never persisted standalone.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub bytes: Vec<u8>,
    /// Which leg produced this result ("subprocess" / "remote").
    pub source: &'static str,
    pub diagnostic: Option<String>,
}

/// The joined output of both transform legs, ready for persistence.
#[derive(Debug, Clone)]
pub struct CombinedResult {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub correlation_id: Uuid,
}

/// Serde adapter carrying `Vec<u8>` as a lowercase hex string.
pub mod hex_payload {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
