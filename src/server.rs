//! HTTP analysis endpoint.
//!
//! `POST /api/analyze` takes a multipart body with one or more `file` (or
//! `files`) parts, runs the authoritative server validator, and answers with
//! one of two JSON envelopes:
//!
//! ```text
//! 200 { "data": {…} | null, "success": true, "model": "…", "timestamp": "…", "filesProcessed": n }
//! 4xx/5xx { "error": "…", "code": "NO_FILES" | …, "success": false, "timestamp": "…" }
//! ```
//!
//! `data: null` with `success: true` means the upload was read fine but is
//! not an ACORD 25; callers must branch on `success`, not on `data`.

use crate::config::{ExtractionConfig, ServerConfig};
use crate::error::{CertScanError, ErrorCode};
use crate::extract::{extract_untrusted, Extractor};
use crate::upload::UploadFile;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTHZ_PATH: &str = "/api/healthz";

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Shared, immutable request state.
pub struct AppState {
    extractor: Extractor,
}

impl AppState {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

/// What the handlers see: the app state plus the transport body limit.
struct RouterState {
    app: Arc<AppState>,
    max_body_bytes: usize,
}

type RouterStateHandle = Arc<RouterState>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    data: Value,
    success: bool,
    model: String,
    timestamp: String,
    files_processed: usize,
}

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
    code: ErrorCode,
    success: bool,
    timestamp: String,
}

/// A [`CertScanError`] translated for the wire.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl From<CertScanError> for ApiError {
    fn from(err: CertScanError) -> Self {
        let code = err.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = %code, error = %err, "analysis request failed");
        } else {
            info!(code = %code, error = %err, "analysis request rejected");
        }

        ApiError {
            status,
            body: ApiErrorBody {
                error: err.public_message(),
                code,
                success: false,
                timestamp: timestamp(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Router with the analysis and health routes, ready to serve or to drive
/// with `tower::ServiceExt::oneshot` in tests.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                path = %request.uri().path()
            )
        })
        .on_response(|response: &Response, latency: Duration, span: &tracing::Span| {
            let latency_ms = latency.as_millis().min(u128::from(u64::MAX)) as u64;
            tracing::info!(
                parent: span,
                status = response.status().as_u16(),
                latency_ms,
                "request completed"
            );
        });

    Router::new()
        .route(ANALYZE_PATH, post(analyze))
        .route(HEALTHZ_PATH, get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer)
        .with_state(Arc::new(RouterState {
            app: state,
            max_body_bytes,
        }))
}

/// A panicking handler still answers with the `INTERNAL_ERROR` envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::from(CertScanError::Internal(format!("handler panicked: {detail}"))).into_response()
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

async fn analyze(
    State(state): State<RouterStateHandle>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| CertScanError::FileProcessing {
        name: "request body".into(),
        detail: rejection.body_text(),
    })?;

    let files = collect_files(&mut multipart, state.max_body_bytes).await?;
    debug!("Received {} file part(s)", files.len());

    let extraction = extract_untrusted(&state.app.extractor, files).await?;

    Ok(Json(AnalyzeResponse {
        data: extraction.data(),
        success: true,
        model: extraction.model,
        timestamp: timestamp(),
        files_processed: extraction.files_processed,
    }))
}

/// Read every `file` / `files` part into memory; other fields are ignored.
async fn collect_files(
    multipart: &mut Multipart,
    max_body_bytes: usize,
) -> Result<Vec<UploadFile>, CertScanError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error("request body", e, max_body_bytes))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if field_name != "file" && field_name != "files" {
            debug!("Ignoring multipart field '{}'", field_name);
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("file-{}", files.len() + 1));
        let media_type = field.content_type().unwrap_or(DEFAULT_MEDIA_TYPE).to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| read_error(&name, e, max_body_bytes))?;

        files.push(UploadFile::new(name, media_type, bytes.to_vec()));
    }

    Ok(files)
}

/// Hitting the body limit is a size problem; anything else is unreadable input.
fn read_error(name: &str, err: MultipartError, max_body_bytes: usize) -> CertScanError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return CertScanError::RequestTooLarge {
            max: max_body_bytes,
        };
    }
    CertScanError::FileProcessing {
        name: name.to_string(),
        detail: err.body_text(),
    }
}

/// Bind and serve until Ctrl-C.
pub async fn serve(
    server: &ServerConfig,
    extraction: &ExtractionConfig,
) -> Result<(), CertScanError> {
    let state = Arc::new(AppState::new(Extractor::new(extraction)));
    let app = build_router(state, server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&server.listen_addr)
        .await
        .map_err(|e| {
            CertScanError::Internal(format!("failed to bind {}: {}", server.listen_addr, e))
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| CertScanError::Internal(format!("failed to read local address: {}", e)))?;

    info!(
        %local_addr,
        models = ?extraction.models,
        provider = %extraction.provider_name,
        "certscan server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CertScanError::Internal(format!("server error: {}", e)))?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_detail() {
        let api = ApiError::from(CertScanError::Internal("db exploded".into()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.code, ErrorCode::InternalError);
        assert!(!api.body.error.contains("exploded"));
        assert!(!api.body.success);
    }

    #[test]
    fn panic_payload_becomes_internal_error() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(String::from("provider bug")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn body_limit_maps_to_total_size_code() {
        let err = CertScanError::RequestTooLarge { max: 1024 };
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.body.code, ErrorCode::TotalSizeExceeded);
        assert!(api.body.error.contains("1024"));
    }

    #[test]
    fn validation_errors_are_bad_request() {
        let api = ApiError::from(CertScanError::NoFiles);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let json = serde_json::to_value(&api.body).unwrap();
        assert_eq!(json["code"], "NO_FILES");
        assert_eq!(json["success"], false);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
