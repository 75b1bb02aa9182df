pub mod client;
pub mod error;
pub mod locator;

pub use client::{BlobStore, HttpBlobStore};
pub use error::BlobError;
pub use locator::extract_correlation_id;
