//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "chiffre gateway API",
        version = "0.1.0",
        description = "Asynchronous fan-out/fan-in cipher pipeline: submit a payload, receive a correlation id, and collect the completion event over SSE.",
    ),
    tags(
        (name = "Health", description = "Gateway readiness"),
        (name = "Pipeline", description = "Job submission, push subscription, and fulfillment"),
    ),
    paths(
        crate::api::health::health,
        crate::api::ingest::upload,
        crate::api::events::events_subscribe,
        crate::api::events::notification_fulfill,
    ),
    components(schemas(
        crate::api::ApiErrorResponse,
        crate::api::ingest::UploadResponse,
        crate::api::events::FulfillResponse,
        crate::api::health::HealthResponse,
    ))
)]
pub struct ApiDoc;
