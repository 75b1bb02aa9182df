//! Gateway HTTP handlers.

pub mod doc;
pub mod events;
pub mod health;
pub mod ingest;

#[cfg(test)]
mod tests;

pub use events::{events_subscribe, notification_fulfill};
pub use health::health;
pub use ingest::upload;

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Uniform error body for all gateway endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub error: String,
}

pub(crate) fn bad_request(msg: impl Into<String>) -> (axum::http::StatusCode, Json<ApiErrorResponse>) {
    (
        axum::http::StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse { error: msg.into() }),
    )
}

pub(crate) fn internal_error(
    e: impl std::fmt::Display,
) -> (axum::http::StatusCode, Json<ApiErrorResponse>) {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiErrorResponse {
            error: e.to_string(),
        }),
    )
}
