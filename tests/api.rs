//! HTTP contract tests for `POST /api/analyze` and `GET /api/healthz`.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! model is a canned backend, so no network or API key is needed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use certscan::server::{build_router, AppState, ANALYZE_PATH, HEALTHZ_PATH};
use certscan::{
    BackendError, ExtractionConfig, ExtractionRequest, Extractor, ModelReply, VisionBackend,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "certscan-test-boundary";

/// Always gives the same answer (or error) and counts calls.
struct CannedBackend {
    answer: Result<&'static str, &'static str>,
    calls: Mutex<usize>,
}

impl CannedBackend {
    fn answering(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text),
            calls: Mutex::new(0),
        })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl VisionBackend for CannedBackend {
    async fn complete(
        &self,
        _model: &str,
        _request: &ExtractionRequest,
    ) -> Result<ModelReply, BackendError> {
        *self.calls.lock().unwrap() += 1;
        match self.answer {
            Ok(text) => Ok(ModelReply {
                content: text.to_string(),
                input_tokens: 0,
                output_tokens: 0,
            }),
            Err(message) => Err(BackendError::Api(message.to_string())),
        }
    }
}

/// Crashes inside the provider call.
struct PanickingBackend;

#[async_trait]
impl VisionBackend for PanickingBackend {
    async fn complete(
        &self,
        _model: &str,
        _request: &ExtractionRequest,
    ) -> Result<ModelReply, BackendError> {
        panic!("provider bug");
    }
}

fn router(backend: Arc<dyn VisionBackend>, max_body_bytes: usize) -> Router {
    let config = ExtractionConfig::builder()
        .models(["gpt-4.1-mini", "gpt-4.1"])
        .backend(backend)
        .build()
        .expect("test config is valid");
    build_router(Arc::new(AppState::new(Extractor::new(&config))), max_body_bytes)
}

fn app(backend: Arc<CannedBackend>) -> Router {
    router(backend, 16 * 1024 * 1024)
}

/// `(field, file name, content type, bytes)` parts → multipart body.
fn multipart_body(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn analyze_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(ANALYZE_PATH)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builder should not fail")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body must be readable")
        .to_bytes();
    let value = serde_json::from_slice(bytes.as_ref()).expect("response must be valid JSON");
    (status, value)
}

fn assert_error(status: StatusCode, body: &Value, expected_status: StatusCode, code: &str) {
    assert_eq!(status, expected_status, "body: {body}");
    assert_eq!(body["code"], code);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn healthz_returns_ok_json() {
    let request = Request::builder()
        .method("GET")
        .uri(HEALTHZ_PATH)
        .body(Body::empty())
        .expect("request builder should not fail");

    let (status, body) = send(app(CannedBackend::answering("null")), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn recognised_certificate_returns_success_envelope() {
    let backend = CannedBackend::answering(
        r#"```json
{"insurers": [{"insurer_letter": "A", "insurer_name": "Acme Mutual", "naic_code": "12345"}]}
```"#,
    );
    let body = multipart_body(&[
        ("file", "page1.jpg", "image/jpeg", b"\xFF\xD8\xFF\xE0page1".as_slice()),
        ("file", "page2.jpg", "image/jpeg", b"\xFF\xD8\xFF\xE0page2".as_slice()),
    ]);

    let (status, body) = send(app(backend.clone()), analyze_request(body)).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["model"], "gpt-4.1-mini");
    assert_eq!(body["filesProcessed"], 2);
    assert_eq!(
        body["data"],
        json!({ "insurers": [{ "insurer_letter": "A", "insurer_name": "Acme Mutual", "naic_code": "12345" }] })
    );
    assert!(body["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn unrecognised_document_is_success_with_null_data() {
    let body = multipart_body(&[("file", "menu.png", "image/png", b"\x89PNGmenu".as_slice())]);
    let (status, body) = send(app(CannedBackend::answering("null")), analyze_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
    assert_eq!(body["filesProcessed"], 1);
}

#[tokio::test]
async fn files_field_name_is_accepted_and_other_fields_ignored() {
    let mut raw = Vec::new();
    raw.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n"
        )
        .as_bytes(),
    );
    raw.extend_from_slice(&multipart_body(&[(
        "files",
        "scan.webp",
        "image/webp",
        b"RIFFscan".as_slice(),
    )]));

    let (status, body) = send(app(CannedBackend::answering("null")), analyze_request(raw)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["filesProcessed"], 1);
}

#[tokio::test]
async fn missing_file_parts_is_no_files() {
    let backend = CannedBackend::answering("null");
    let raw = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );

    let (status, body) = send(app(backend.clone()), analyze_request(raw.into_bytes())).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, "NO_FILES");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn six_images_is_too_many_files() {
    let parts: Vec<(&str, &str, &str, &[u8])> = ["a", "b", "c", "d", "e", "f"]
        .iter()
        .map(|name| ("file", *name, "image/png", b"\x89PNG".as_slice()))
        .collect();
    let backend = CannedBackend::answering("null");

    let (status, body) = send(app(backend.clone()), analyze_request(multipart_body(&parts))).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, "TOO_MANY_FILES");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn pdf_upload_is_invalid_file_type() {
    let body = multipart_body(&[("file", "cert.pdf", "application/pdf", b"%PDF-1.7".as_slice())]);
    let (status, body) = send(app(CannedBackend::answering("null")), analyze_request(body)).await;

    assert_error(status, &body, StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE");
    assert!(body["error"].as_str().unwrap().contains("cert.pdf"));
}

#[tokio::test]
async fn oversized_image_is_file_too_large() {
    let big = vec![0u8; 2 * 1024 * 1024 + 1];
    let body = multipart_body(&[("file", "huge.jpg", "image/jpeg", big.as_slice())]);
    let (status, body) = send(app(CannedBackend::answering("null")), analyze_request(body)).await;

    assert_error(status, &body, StatusCode::BAD_REQUEST, "FILE_TOO_LARGE");
    assert!(body["error"].as_str().unwrap().contains("huge.jpg"));
}

#[tokio::test]
async fn model_failure_is_ai_analysis_failed() {
    let backend = CannedBackend::failing("upstream 502");
    let body = multipart_body(&[("file", "page.jpg", "image/jpeg", b"\xFF\xD8page".as_slice())]);

    let (status, body) = send(app(backend.clone()), analyze_request(body)).await;
    assert_error(status, &body, StatusCode::INTERNAL_SERVER_ERROR, "AI_ANALYSIS_FAILED");
    // Both models were tried once.
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn non_multipart_body_is_file_processing_error() {
    let request = Request::builder()
        .method("POST")
        .uri(ANALYZE_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file": "nope"}"#))
        .expect("request builder should not fail");

    let (status, body) = send(app(CannedBackend::answering("null")), request).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, "FILE_PROCESSING_ERROR");
}

#[tokio::test]
async fn panicking_backend_is_internal_error() {
    let body = multipart_body(&[("file", "page.png", "image/png", b"\x89PNGpage".as_slice())]);

    let (status, body) = send(router(Arc::new(PanickingBackend), 16 * 1024 * 1024), analyze_request(body)).await;
    assert_error(status, &body, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR");
    // Panic detail stays in the logs.
    assert!(!body["error"].as_str().unwrap().contains("provider bug"));
}

#[tokio::test]
async fn body_over_transport_limit_is_total_size_exceeded() {
    let backend = CannedBackend::answering("null");
    let big = vec![0u8; 8 * 1024];
    let body = multipart_body(&[("file", "scan.jpg", "image/jpeg", big.as_slice())]);

    let (status, body) = send(router(backend.clone(), 1024), analyze_request(body)).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST, "TOTAL_SIZE_EXCEEDED");
    assert_eq!(backend.calls(), 0);
}
