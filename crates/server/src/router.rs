//! HTTP router construction.
//!
//! Assembles the gateway routes, middleware, and OpenAPI docs into a
//! single `Router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete gateway router.
pub fn build_router(state: Arc<AppState>, max_upload_mb: u64) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/upload", post(api::upload))
        .route("/api/events", get(api::events_subscribe))
        .route("/api/notification/{id}", get(api::notification_fulfill))
        .layer(DefaultBodyLimit::max((max_upload_mb * 1024 * 1024) as usize))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
