//! HTTP API.
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `POST /shrink?width=&rotate=` | multipart, `file` part | [`ShrinkReport`] |
//! | `POST /upscale?file_key=` | none | [`UpscaleReport`] |
//! | `GET /<mount>/...` | none | files under the storage root |
//!
//! Pipeline calls block (image codecs, the upscaler child process), so each
//! one runs on tokio's blocking pool. CORS is wide open: the browser UI is
//! served from another origin.
//!
//! Malformed query strings and multipart bodies get the same JSON error body
//! as every other rejection.

use crate::imaging::Rotation;
use crate::pipeline::{Pipeline, PipelineError, ShrinkReport, UpscaleReport};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Multipart part carrying the image.
const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing multipart part \"file\"")]
    NoFile,
    #[error("uploaded part has no filename")]
    NoFilename,
    #[error("malformed query string: {0}")]
    BadQuery(String),
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("worker failed: {0}")]
    Join(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::NoFile => (StatusCode::BAD_REQUEST, "NO_FILE"),
            Self::NoFilename => (StatusCode::BAD_REQUEST, "NO_FILENAME"),
            Self::BadQuery(_) => (StatusCode::BAD_REQUEST, "BAD_QUERY"),
            Self::Multipart(_) => (StatusCode::BAD_REQUEST, "BAD_MULTIPART"),
            Self::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            Self::Pipeline(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.code()),
            Self::Pipeline(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.code()),
            Self::Pipeline(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }

        let body = Json(serde_json::json!({
            "error": code,
            "detail": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ShrinkQuery {
    pub width: Option<u32>,
    pub rotate: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpscaleQuery {
    pub file_key: String,
}

/// Build the application router. The storage root is served under `/<mount>`.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let mount = format!("/{}", pipeline.settings().mount);
    let files = ServeDir::new(pipeline.storage().root());

    Router::new()
        .route("/shrink", post(shrink))
        .route("/upscale", post(upscale))
        .nest_service(&mount, files)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        storage = %pipeline.storage().root().display(),
        "listening"
    );
    axum::serve(listener, router(pipeline)).await
}

async fn shrink(
    State(pipeline): State<Arc<Pipeline>>,
    query: Result<Query<ShrinkQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ShrinkReport>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadQuery(e.body_text()))?;
    let mut multipart = multipart.map_err(|e| ApiError::Multipart(e.body_text()))?;
    let (filename, bytes) = read_file_part(&mut multipart).await?;
    let rotation = Rotation::from_degrees(query.rotate.unwrap_or(0));

    let report =
        run_blocking(move || pipeline.shrink(&filename, &bytes, query.width, rotation)).await?;
    Ok(Json(report))
}

async fn upscale(
    State(pipeline): State<Arc<Pipeline>>,
    query: Result<Query<UpscaleQuery>, QueryRejection>,
) -> Result<Json<UpscaleReport>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadQuery(e.body_text()))?;
    let report = run_blocking(move || pipeline.upscale(&query.file_key)).await?;
    Ok(Json(report))
}

/// First part named `file`, with its client-supplied filename.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(String::from).ok_or(ApiError::NoFilename)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Multipart(e.to_string()))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::NoFile)
}

async fn run_blocking<T, F>(job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::Join(e.to_string()))?
        .map_err(ApiError::from)
}
