use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::fallback::RemoteMatcher;
use crate::ingest::extract_text;
use crate::models::{AnalyzeResponse, AnalyzeTextRequest, MatchResult};
use crate::pipeline::PolicyAnalyzer;

const MISSING_INPUT_MESSAGE: &str = "Missing file or prompt.";

#[derive(Clone)]
struct AppState {
    config: AppConfig,
    analyzer: Arc<PolicyAnalyzer>,
    remote: RemoteMatcher,
}

pub async fn run_server(
    config: AppConfig,
    analyzer: Arc<PolicyAnalyzer>,
    remote: RemoteMatcher,
) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr: SocketAddr = config.bind_addr.parse()?;
    let app = router(AppState {
        config,
        analyzer,
        remote,
    });

    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index_page).post(upload_handler))
        .route("/api/analyze", post(analyze_text_handler))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let template = IndexTemplate {
        strategy: state.config.matching.strategy.to_string(),
        threshold: format!("{:.2}", state.config.matching.threshold),
    };
    let body = template.render()?;

    Ok(Html(body))
}

async fn health() -> &'static str {
    "ok"
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut prompt: Option<String> = None;
    let mut use_remote = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload = Some((file_name, bytes.to_vec()));
                }
            }
            "prompt" => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    prompt = Some(text);
                }
            }
            "mode" => {
                use_remote = field.text().await?.trim().eq_ignore_ascii_case("llm");
            }
            _ => {}
        }
    }

    let (Some((file_name, bytes)), Some(prompt)) = (upload, prompt) else {
        return Err(ApiError::bad_request(MISSING_INPUT_MESSAGE));
    };

    let path = transient_path(&state.config.upload_dir, &file_name);
    if let Err(err) = tokio::fs::write(&path, &bytes).await {
        discard_upload(&path).await;
        return Err(err.into());
    }
    let extracted = extract_text(&path).await;
    discard_upload(&path).await;

    let text = extracted.map_err(|err| {
        tracing::error!("text extraction failed for {}: {:#}", file_name, err);
        ApiError::extraction(err)
    })?;

    if use_remote {
        let answer = state
            .remote
            .answer(&text, &prompt)
            .await
            .map_err(ApiError::upstream)?;
        return Ok(Json(AnalyzeResponse::Remote(answer)));
    }

    Ok(Json(AnalyzeResponse::Matched(
        state.analyzer.analyze(&text, &prompt),
    )))
}

async fn analyze_text_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Result<Json<MatchResult>, ApiError> {
    if request.text.trim().is_empty() || request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Missing text or prompt."));
    }

    Ok(Json(state.analyzer.analyze(&request.text, &request.prompt)))
}

async fn discard_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!("failed to remove upload {}: {}", path.display(), err),
    }
}

/// Unique path for an upload, keeping the original extension so the extractor
/// can tell PDF from DOCX.
fn transient_path(upload_dir: &Path, file_name: &str) -> PathBuf {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload");
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    upload_dir.join(format!("{}-{}", Uuid::new_v4(), safe))
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    strategy: String,
    threshold: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn extraction(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("could not extract text from document: {err:#}"),
        }
    }

    fn upstream(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("remote model failed: {err:#}"),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(value: askama::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(value: MultipartError) -> Self {
        Self {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
