//! HTTP surface: `GET /`, `GET /health`, `POST /analyze`.
//!
//! Handlers hold no state of their own. The only thing shared between
//! requests is the read-only [`AppState`]; everything a request creates
//! (including its temp file) dies with it.

use crate::analyze::analyze_document;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::AnalysisResponse;
use crate::pipeline::assemble::assemble;
use crate::pipeline::intake::UploadedDocument;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const SERVICE_NAME: &str = "Blood Test Report Analyzer";

/// Room for multipart boundaries and the text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// State shared by all routes.
pub struct AppState {
    pub config: AnalyzerConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            started_at: Utc::now(),
        }
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, config: AnalyzerConfig) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(config));
    info!(
        "Upload directory: {} (limit {} bytes, text source: {})",
        state.config.upload_dir.display(),
        state.config.max_upload_bytes,
        state.config.text_source.label()
    );
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on {}", SERVICE_NAME, listener.local_addr()?);
    axum::serve(listener, app).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": format!("{SERVICE_NAME} API is running"),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "text_source": state.config.text_source.label(),
        "analysis_types": ["comprehensive", "nutrition", "exercise", "verification"],
        "endpoints": {
            "analyze": "POST /analyze (multipart: file, query, analysis_type)",
            "health": "GET /health",
        },
    }))
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    text_source: &'static str,
    started_at: DateTime<Utc>,
    ready: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        text_source: state.config.text_source.label(),
        started_at: state.started_at,
        ready: true,
    })
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload: Option<UploadedDocument> = None;
    let mut query: Option<String> = None;
    let mut analysis_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await?;
                if bytes.len() > state.config.max_upload_bytes {
                    return Err(ApiError::PayloadTooLarge {
                        limit: state.config.max_upload_bytes,
                    });
                }
                upload = Some(UploadedDocument::new(bytes.to_vec(), filename));
            }
            "query" => query = Some(field.text().await?),
            "analysis_type" => analysis_type = Some(field.text().await?),
            _ => {}
        }
    }

    let doc = upload.ok_or(AnalyzerError::MissingFile)?;
    let output = analyze_document(
        &doc,
        query.as_deref(),
        analysis_type.as_deref(),
        &state.config,
    )
    .await?;

    Ok(Json(assemble(&output, &state.config.disclaimer)))
}

// ── Errors ───────────────────────────────────────────────────────────────

/// JSON error body: `{"detail": …, "code": …}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: &'static str,
}

/// Request failures with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    NotMultipart(#[from] MultipartRejection),
    #[error("File too large. Maximum {limit} bytes.")]
    PayloadTooLarge { limit: usize },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match &self {
            ApiError::Analyzer(e) if e.is_client_error() => {
                warn!("Rejected upload: {}", e);
                (StatusCode::BAD_REQUEST, e.code(), e.to_string())
            }
            ApiError::Analyzer(e) => {
                error!("Analysis failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.code(),
                    format!("Processing error: {e}"),
                )
            }
            ApiError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                warn!("Upload exceeds body limit: {}", e.body_text());
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", e.body_text())
            }
            ApiError::Multipart(e) => {
                warn!("Malformed multipart body: {}", e.body_text());
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", e.body_text())
            }
            ApiError::NotMultipart(e) => {
                warn!("Rejected request body: {}", e.body_text());
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", e.body_text())
            }
            ApiError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string())
            }
        };

        (status, Json(ErrorBody { detail, code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let dir = std::env::temp_dir().join("bloodreport-server-unit");
        let config = AnalyzerConfig::builder().upload_dir(dir).build().unwrap();
        router(Arc::new(AppState::new(config)))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 65536).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ready() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ready"], true);
        assert_eq!(body["text_source"], "template");
    }

    #[tokio::test]
    async fn root_describes_service() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let body = json_body(app().oneshot(req).await.unwrap()).await;
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn client_errors_map_to_400() {
        let response = ApiError::from(AnalyzerError::EmptyPayload).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn processing_errors_map_to_500_with_prefix() {
        let response = ApiError::from(AnalyzerError::Internal("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["code"], "PROCESSING_ERROR");
        assert_eq!(body["detail"], "Processing error: Internal error: disk on fire");
    }

    #[tokio::test]
    async fn oversized_file_is_413() {
        let response = ApiError::PayloadTooLarge { limit: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    }
}
