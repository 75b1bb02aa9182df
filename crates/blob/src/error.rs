//! Blob store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}
