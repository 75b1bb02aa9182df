//! Gateway handler tests against an in-memory publisher and registry.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::util::ServiceExt;
use uuid::Uuid;

use chiffre_core::Job;
use chiffre_notify::NotificationRegistry;
use chiffre_queue::{QueueError, QueuePublisher};

use crate::router::build_router;
use crate::state::AppState;

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<Job>>,
}

#[async_trait]
impl QueuePublisher for RecordingPublisher {
    async fn publish(&self, job: &Job) -> Result<String, QueueError> {
        self.published.lock().unwrap().push(job.clone());
        Ok("msg-1".to_string())
    }
}

fn test_state() -> (Arc<RecordingPublisher>, Arc<AppState>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let state = Arc::new(AppState {
        registry: Arc::new(NotificationRegistry::new()),
        publisher: publisher.clone(),
        blob_public_url: "http://blobs.local:3001".to_string(),
    });
    (publisher, state)
}

const BOUNDARY: &str = "test-boundary-7f92";

fn multipart_body(file: Option<&[u8]>, mode: &str, operation: &str, key: &str) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pic.bmp\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in [("mode", mode), ("operation", operation), ("key", key)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_enqueues_and_returns_correlation_id() {
    let (publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(upload_request(multipart_body(
            Some(b"0123456789"),
            "CBC",
            "encrypt",
            "K",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["message"], "File uploaded!");
    let returned_id: Uuid = json["correlationId"].as_str().unwrap().parse().unwrap();

    let published = publisher.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].correlation_id, returned_id);
    assert_eq!(published[0].payload, b"0123456789");
    assert_eq!(published[0].file_name, "pic.bmp");
}

#[tokio::test]
async fn test_upload_rejects_empty_file_before_enqueue() {
    let (publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(upload_request(multipart_body(Some(b""), "ECB", "encrypt", "K")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(publisher.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_missing_file() {
    let (publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(upload_request(multipart_body(None, "CBC", "decrypt", "K")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(publisher.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_unknown_mode() {
    let (_publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(upload_request(multipart_body(
            Some(b"x"),
            "GCM",
            "encrypt",
            "K",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fulfill_delivers_to_subscriber() {
    let (_publisher, state) = test_state();
    let id = Uuid::new_v4();
    let mut rx = state.registry.subscribe(id);
    let app = build_router(state, 25);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/notification/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["delivered"], true);

    let event = rx.recv().await.unwrap();
    let path = event.path.unwrap();
    assert_eq!(path, format!("http://blobs.local:3001/api/blobs/{id}/file"));
}

#[tokio::test]
async fn test_fulfill_without_subscriber_is_a_noop() {
    let (_publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/notification/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["delivered"], false);
}

#[tokio::test]
async fn test_fulfill_rejects_malformed_id() {
    let (_publisher, state) = test_state();
    let app = build_router(state, 25);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/notification/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sse_stream_carries_the_terminal_event() {
    let (_publisher, state) = test_state();
    let id = Uuid::new_v4();
    let app = build_router(state.clone(), 25);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/events?jobid={id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Fulfill after the subscription is registered; the stream then ends
    // because the channel's sender is dropped with the terminal event.
    assert!(state.registry.fulfill(
        id,
        chiffre_notify::CompletionEvent {
            path: Some("http://blobs.local:3001/api/blobs/x/file".to_string()),
            status: chiffre_notify::CompletionStatus::Complete,
        },
    ));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("event: completion"));
    assert!(text.contains("Complete"));
    assert!(text.contains("/api/blobs/x/file"));
}
