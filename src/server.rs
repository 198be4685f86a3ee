//! HTTP endpoint (axum).
//!
//! ```text
//! POST /api/convert   multipart/form-data or application/json → PDF | PNG
//! GET  /health        liveness probe
//! ```
//!
//! ## Status mapping
//!
//! Input errors ([`MdPressError::is_input_error`]) answer 400 with their own
//! message. Everything else answers 500 with a fixed generic message; the
//! full detail goes to the log only.
//!
//! ## Upload limit
//!
//! The `file` field is read chunk by chunk and rejected as soon as the
//! running total passes `max_upload_bytes`, so an oversized upload is never
//! buffered in full and never reaches the browser. The router-wide body
//! limit is set well above the upload limit so oversized files get the
//! specific 400 rather than axum's bare 413.

use crate::config::ServerConfig;
use crate::convert::Converter;
use crate::error::MdPressError;
use crate::request::{ConversionRequest, MarkdownSource, OutputFormat, RenderOptions};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Message returned with every 500.
pub const GENERIC_FAILURE: &str = "Failed to convert markdown";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(converter: Arc<Converter>, config: ServerConfig) -> Self {
        Self { converter, config }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/api/convert", post(convert_markdown))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve until Ctrl+C / SIGTERM, then drain in-flight requests.
pub async fn serve(config: ServerConfig, converter: Arc<Converter>) -> Result<(), MdPressError> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| MdPressError::Internal(format!("Failed to bind {}: {}", config.bind, e)))?;

    let addr = listener
        .local_addr()
        .map_err(|e| MdPressError::Internal(format!("Failed to read local address: {}", e)))?;
    info!("mdpress listening on http://{}", addr);

    axum::serve(listener, router(AppState::new(converter, config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MdPressError::Internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "mdpress",
    })
}

/// POST /api/convert
async fn convert_markdown(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let conversion = parse_request(request, &state).await?;
    let rendered = state.converter.convert(&conversion).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(rendered.content_type()),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static(content_disposition(rendered.format)),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(rendered.len())),
    ];
    Ok((StatusCode::OK, headers, rendered.bytes).into_response())
}

fn content_disposition(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Pdf => "attachment; filename=\"document.pdf\"",
        OutputFormat::Png => "attachment; filename=\"document.png\"",
    }
}

// ── Request parsing ──────────────────────────────────────────────────────

/// JSON request body. `preventImageSplit` stays untyped: only the boolean
/// `false` disables the guard, any other value (or none) enables it.
#[derive(Debug, Deserialize)]
struct JsonConvertBody {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default, rename = "preventImageSplit")]
    prevent_image_split: Option<serde_json::Value>,
}

/// Multipart fields collected before the request is validated.
#[derive(Debug, Default)]
struct FormFields {
    file: Option<(Option<String>, Vec<u8>)>,
    markdown: Option<String>,
    format: Option<String>,
    prevent_image_split: Option<String>,
}

async fn parse_request(
    request: Request,
    state: &AppState,
) -> Result<ConversionRequest, MdPressError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| MdPressError::MalformedRequest(e.body_text()))?;
        let fields = read_form(multipart, state.config.max_upload_bytes).await?;
        from_form(fields)
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<JsonConvertBody>::from_request(request, state)
            .await
            .map_err(|e| MdPressError::MalformedRequest(e.body_text()))?;
        ConversionRequest::new(
            &MarkdownSource::Text(body.markdown.unwrap_or_default()),
            OutputFormat::from_param(body.format.as_deref()),
            RenderOptions::from_json_flag(body.prevent_image_split.as_ref()),
        )
    } else {
        Err(MdPressError::MalformedRequest(
            "expected multipart/form-data or application/json".into(),
        ))
    }
}

async fn read_form(
    mut multipart: Multipart,
    upload_limit: usize,
) -> Result<FormFields, MdPressError> {
    let mut fields = FormFields::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(malformed)? {
                    if bytes.len() + chunk.len() > upload_limit {
                        debug!(
                            "Upload {:?} exceeded {} bytes; rejecting",
                            file_name, upload_limit
                        );
                        return Err(MdPressError::FileTooLarge {
                            limit: upload_limit,
                        });
                    }
                    bytes.extend_from_slice(&chunk);
                }
                fields.file = Some((file_name, bytes));
            }
            "markdown" => fields.markdown = Some(field.text().await.map_err(malformed)?),
            "format" => fields.format = Some(field.text().await.map_err(malformed)?),
            "preventImageSplit" => {
                fields.prevent_image_split = Some(field.text().await.map_err(malformed)?)
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(fields)
}

fn from_form(fields: FormFields) -> Result<ConversionRequest, MdPressError> {
    // A zero-length file counts as no file at all.
    let source = match fields.file {
        Some((name, bytes)) if !bytes.is_empty() => MarkdownSource::File { name, bytes },
        _ => MarkdownSource::Text(fields.markdown.unwrap_or_default()),
    };
    ConversionRequest::new(
        &source,
        OutputFormat::from_param(fields.format.as_deref()),
        RenderOptions::from_form_flag(fields.prevent_image_split.as_deref()),
    )
}

fn malformed(e: MultipartError) -> MdPressError {
    MdPressError::MalformedRequest(e.body_text())
}

// ── Error responses ──────────────────────────────────────────────────────

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Maps [`MdPressError`] onto an HTTP status and JSON body.
#[derive(Debug)]
pub struct ApiError(pub MdPressError);

impl From<MdPressError> for ApiError {
    fn from(e: MdPressError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_input_error() {
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!("Conversion failed: {}", self.0);
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_file_falls_back_to_markdown_field() {
        let request = from_form(FormFields {
            file: Some((Some("empty.md".into()), Vec::new())),
            markdown: Some("# From field".into()),
            ..FormFields::default()
        })
        .unwrap();
        assert_eq!(request.markdown(), "# From field");
    }

    #[test]
    fn file_wins_over_markdown_field() {
        let request = from_form(FormFields {
            file: Some((None, b"# From file".to_vec())),
            markdown: Some("# From field".into()),
            format: Some("png".into()),
            prevent_image_split: Some("false".into()),
        })
        .unwrap();
        assert_eq!(request.markdown(), "# From file");
        assert_eq!(request.format(), OutputFormat::Png);
        assert!(!request.options().prevent_image_overflow);
    }

    #[test]
    fn missing_content_is_empty_error() {
        let err = from_form(FormFields::default()).unwrap_err();
        assert!(matches!(err, MdPressError::EmptyContent));
    }

    #[test]
    fn pipeline_errors_hide_detail() {
        let response = ApiError(MdPressError::LoadTimeout { secs: 30 }).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError(MdPressError::EmptyContent).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn disposition_names_document() {
        assert_eq!(
            content_disposition(OutputFormat::Png),
            format!("attachment; filename=\"{}\"", OutputFormat::Png.file_name())
        );
    }
}
