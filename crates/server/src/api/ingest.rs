//! Submission endpoint: multipart upload → job on the queue.
//!
//! Acknowledge-then-detach: the caller gets `{message, correlationId}`
//! back before any processing happens and is expected to open a push
//! subscription with the returned id separately.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use chiffre_core::{CipherMode, CipherOperation, Job};

use crate::state::AppState;

use super::{bad_request, internal_error, ApiErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub correlation_id: Uuid,
}

/// Accept a cipher job submission
///
/// Multipart fields: `file` (the binary payload), `mode` (ECB|CBC),
/// `operation` (encrypt|decrypt), `key`. Responds immediately with the
/// minted correlation id; processing outcome arrives only over the push
/// channel.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Pipeline",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Job accepted and enqueued", body = UploadResponse),
        (status = 400, description = "Missing or empty field", body = ApiErrorResponse),
        (status = 500, description = "Queue publish failed", body = ApiErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (axum::http::StatusCode, Json<ApiErrorResponse>)> {
    let mut payload: Option<Vec<u8>> = None;
    let mut file_name = String::new();
    let mut mode: Option<CipherMode> = None;
    let mut operation: Option<CipherOperation> = None;
    let mut key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read file field: {e}")))?;
                payload = Some(bytes.to_vec());
            }
            "mode" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("failed to read mode field: {e}")))?;
                mode = Some(text.parse().map_err(bad_request)?);
            }
            "operation" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("failed to read operation field: {e}")))?;
                operation = Some(text.parse().map_err(bad_request)?);
            }
            "key" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("failed to read key field: {e}")))?;
                key = Some(text);
            }
            other => {
                // Unknown fields are ignored rather than rejected.
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    // A missing or empty payload never reaches the queue.
    let payload = match payload {
        Some(bytes) if !bytes.is_empty() => bytes,
        Some(_) => return Err(bad_request("uploaded file is empty")),
        None => return Err(bad_request("missing 'file' field")),
    };
    let mode = mode.ok_or_else(|| bad_request("missing 'mode' field"))?;
    let operation = operation.ok_or_else(|| bad_request("missing 'operation' field"))?;
    let key = match key {
        Some(k) if !k.is_empty() => k,
        _ => return Err(bad_request("missing 'key' field")),
    };

    let job = Job::new(payload, file_name, mode, operation, key);
    let correlation_id = job.correlation_id;

    state
        .publisher
        .publish(&job)
        .await
        .map_err(internal_error)?;

    info!(
        correlation_id = %correlation_id,
        file_name = %job.file_name,
        payload_len = job.payload.len(),
        "Job enqueued"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded!".to_string(),
        correlation_id,
    }))
}
