//! Push channel endpoints: SSE subscribe and the pipeline-facing fulfill
//! trigger.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use chiffre_notify::{CompletionEvent, CompletionStatus};

use crate::state::AppState;

use super::{bad_request, ApiErrorResponse};

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    pub jobid: Uuid,
}

/// Open the completion push channel for a job
///
/// Streams exactly one terminal event (`{path, status}` JSON) for the
/// given correlation id, then closes. A second subscribe for the same id
/// replaces the first.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Pipeline",
    params(("jobid" = Uuid, Query, description = "Correlation id returned at submission")),
    responses(
        (status = 200, description = "SSE stream carrying one terminal event", content_type = "text/event-stream")
    )
)]
pub async fn events_subscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SubscribeParams>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    info!(correlation_id = %params.jobid, "Push subscription opened");

    let rx = state.registry.subscribe(params.jobid);
    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event)
            .unwrap_or_else(|_| r#"{"path":null,"status":"TimedOut"}"#.to_string());
        Ok(Event::default().event("completion").data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FulfillResponse {
    /// Whether a subscriber was present and got the event. `false` is not
    /// an error: no buffering, no redelivery.
    pub delivered: bool,
}

/// Fulfill a job's push channel (pipeline-internal trigger)
///
/// Called by the pipeline worker once storage succeeds. Builds the blob
/// download URL for the id and pushes the terminal event to the waiting
/// subscriber, if any.
#[utoipa::path(
    get,
    path = "/api/notification/{id}",
    tag = "Pipeline",
    params(("id" = String, Path, description = "Correlation id recovered from the blob locator")),
    responses(
        (status = 200, description = "Delivery attempted", body = FulfillResponse),
        (status = 400, description = "Malformed correlation id", body = ApiErrorResponse)
    )
)]
pub async fn notification_fulfill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FulfillResponse>, (axum::http::StatusCode, Json<ApiErrorResponse>)> {
    let correlation_id: Uuid = id
        .parse()
        .map_err(|_| bad_request(format!("not a correlation id: {id}")))?;

    let path = format!(
        "{}/api/blobs/{}/file",
        state.blob_public_url.trim_end_matches('/'),
        correlation_id
    );

    let delivered = state.registry.fulfill(
        correlation_id,
        CompletionEvent {
            path: Some(path),
            status: CompletionStatus::Complete,
        },
    );

    info!(correlation_id = %correlation_id, delivered, "Fulfill triggered");
    Ok(Json(FulfillResponse { delivered }))
}
