//! Minimal HTTP front end: an upload form and one generation endpoint.
//!
//! `GET /` serves the form; `POST /generate` takes a multipart body with an
//! `api_key` text field and a `file` PDF field and answers with
//! `report.zip`. Requests without a key or without a file are rejected
//! with 400 before any processing.

use crate::config::DraftConfig;
use crate::convert::generate_report;
use crate::error::DraftError;
use crate::pipeline::input::PdfSource;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Lab report drafter</title></head>
<body>
<h1>Lab report drafter</h1>
<form action="/generate" method="post" enctype="multipart/form-data">
  <p><label>API key <input type="password" name="api_key" autocomplete="off"></label></p>
  <p><label>Textbook PDF <input type="file" name="file" accept=".pdf,application/pdf"></label></p>
  <p><button type="submit">Generate</button></p>
</form>
</body>
</html>
"#;

const MISSING_INPUT: &str = "Please provide both an API key and a PDF file.";

#[derive(Clone)]
struct AppState {
    config: Arc<DraftConfig>,
}

/// Build the router. `config` is the template for every request; the
/// uploaded key replaces its `api_key`.
pub fn router(config: DraftConfig) -> Router {
    let limit = config.max_upload_bytes;
    Router::new()
        .route("/", get(form))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            config: Arc::new(config),
        })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, config: DraftConfig) -> Result<(), DraftError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DraftError::Internal(format!("cannot bind {addr}: {e}")))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, router(config))
        .await
        .map_err(|e| DraftError::Internal(format!("server error: {e}")))
}

async fn form() -> Html<&'static str> {
    Html(FORM)
}

async fn generate(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut api_key = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read multipart field: {}", e);
                return (StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")).into_response();
            }
        };
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "api_key" => match field.text().await {
                Ok(text) => api_key = text.trim().to_string(),
                Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            },
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload.pdf".to_string());
                match field.bytes().await {
                    Ok(data) => upload = Some((filename, data.to_vec())),
                    Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
                }
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let mut config = (*state.config).clone();
    if api_key.is_empty() && config.provider.is_none() {
        return (StatusCode::BAD_REQUEST, MISSING_INPUT).into_response();
    }
    let Some((filename, data)) = upload.filter(|(_, data)| !data.is_empty()) else {
        return (StatusCode::BAD_REQUEST, MISSING_INPUT).into_response();
    };
    if !api_key.is_empty() {
        config.api_key = Some(api_key);
    }

    let result = match PdfSource::from_bytes(filename, data, config.max_pdf_bytes) {
        Ok(pdf) => generate_report(pdf, &config).await,
        Err(e) => Err(e),
    };

    match result.and_then(|output| output.to_archive_bytes()) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/zip"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"report.zip\""),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: DraftError) -> Response {
    let status = if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else if e.is_llm_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    if status.is_server_error() {
        tracing::error!("Report generation failed: {}", e);
    }
    (status, e.to_string()).into_response()
}
