use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use oxidize_media::{execute, params, TransformRequest, TransformResult};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::auth::require_api_key;
use crate::config::ServerConfig;
use crate::error::{AppError, Operation};
use crate::form::FormData;
use crate::response::{ImageEnvelope, PdfEnvelope, RotateEnvelope};
use crate::state::AppState;

/// Query parameters shared by the image endpoints. Everything arrives as raw
/// text and is validated by [`params`].
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub format: Option<String>,
    pub quality: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub fit: Option<String>,
    pub left: Option<String>,
    pub top: Option<String>,
}

/// Build the application router with all routes configured
pub fn app(config: &ServerConfig) -> Router {
    router(AppState::new(config), config.max_upload_bytes)
}

/// Router over an existing state, so the caller can share its [`TempStore`](oxidize_media::TempStore).
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Image operations
        .route("/api/compress-image", post(compress_image))
        .route("/api/convert-image", post(convert_image))
        .route("/api/crop-image", post(crop_image))
        .route("/api/resize-image", post(resize_image))
        // PDF operations
        .route("/api/pdf-merge", post(pdf_merge))
        .route("/api/pdf-organize", post(pdf_organize))
        .route("/api/pdf-rotate", post(pdf_rotate))
        .route("/api/pdf-split", post(pdf_split))
        .route("/health", get(health_check))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oxidize-media API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Execute a validated request on the blocking pool.
async fn run(
    state: &AppState,
    operation: Operation,
    request: TransformRequest,
) -> Result<TransformResult, AppError> {
    let temp = Arc::clone(state.temp());
    tokio::task::spawn_blocking(move || execute(request, &temp))
        .await?
        .map_err(AppError::transform(operation))
}

async fn image_file(multipart: Multipart) -> Result<oxidize_media::UploadedFile, AppError> {
    let mut form = FormData::collect(multipart).await?;
    params::require_file(form.file("file"), "file").map_err(AppError::transform(Operation::Image))
}

/// Recompress, optionally changing format
pub async fn compress_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    multipart: Multipart,
) -> Result<Json<ImageEnvelope>, AppError> {
    let file = image_file(multipart).await?;
    let request =
        params::compress_request(file, query.format.as_deref(), query.quality.as_deref())
            .map_err(AppError::transform(Operation::Image))?;
    let result = run(&state, Operation::Image, request).await?;
    Ok(Json(result.into()))
}

/// Convert to another format
pub async fn convert_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    multipart: Multipart,
) -> Result<Json<ImageEnvelope>, AppError> {
    let file = image_file(multipart).await?;
    let request = params::convert_request(file, query.format.as_deref(), query.quality.as_deref())
        .map_err(AppError::transform(Operation::Image))?;
    let result = run(&state, Operation::Image, request).await?;
    Ok(Json(result.into()))
}

/// Cut an exact rectangle out of the upload
pub async fn crop_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    multipart: Multipart,
) -> Result<Json<ImageEnvelope>, AppError> {
    let file = image_file(multipart).await?;
    let request = params::crop_request(
        file,
        query.left.as_deref(),
        query.top.as_deref(),
        query.width.as_deref(),
        query.height.as_deref(),
    )
    .map_err(AppError::transform(Operation::Crop))?;
    let result = run(&state, Operation::Crop, request).await?;
    Ok(Json(result.into()))
}

/// Resize into a box using one of the fit strategies
pub async fn resize_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    multipart: Multipart,
) -> Result<Json<ImageEnvelope>, AppError> {
    let file = image_file(multipart).await?;
    let raw = params::ResizeParams {
        format: query.format.as_deref(),
        width: query.width.as_deref(),
        height: query.height.as_deref(),
        fit: query.fit.as_deref(),
        quality: query.quality.as_deref(),
    };
    let request = params::resize_request(file, raw, state.max_dimension())
        .map_err(AppError::transform(Operation::Image))?;
    let result = run(&state, Operation::Image, request).await?;
    Ok(Json(result.into()))
}

/// Merge multiple PDF files into a single PDF
pub async fn pdf_merge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = FormData::collect(multipart).await?;
    let files = form.files(&["files", "files[]"]);
    let count = files.len();
    let request =
        params::merge_request(files).map_err(AppError::transform(Operation::Merge))?;
    let result = run(&state, Operation::Merge, request).await?;
    info!(files = count, bytes = result.byte_len, "PDFs merged");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"merged.pdf\""),
        ],
        result.data,
    )
        .into_response())
}

/// Rebuild a PDF in the page order given by the `order` field
pub async fn pdf_organize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PdfEnvelope>, AppError> {
    let mut form = FormData::collect(multipart).await?;
    let request = params::require_file(form.file("file"), "file")
        .and_then(|file| {
            let order = params::require_text(form.text("order"), "order")?;
            params::reorder_request(file, order)
        })
        .map_err(AppError::transform(Operation::Pdf))?;
    let result = run(&state, Operation::Pdf, request).await?;
    Ok(Json(result.into()))
}

/// Rotate every page by the `angle` field
pub async fn pdf_rotate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RotateEnvelope>, AppError> {
    let mut form = FormData::collect(multipart).await?;
    let request = params::require_file(form.file("file"), "file")
        .and_then(|file| params::rotate_request(file, form.text("angle")))
        .map_err(AppError::transform(Operation::Rotate))?;
    let result = run(&state, Operation::Rotate, request).await?;
    Ok(Json(result.into()))
}

/// Extract the pages listed in the `pages` field as a download
pub async fn pdf_split(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = FormData::collect(multipart).await?;
    let request = params::require_file(form.file("file"), "file")
        .and_then(|file| {
            let pages = params::require_text(form.text("pages"), "pages")?;
            params::split_request(file, pages)
        })
        .map_err(AppError::transform(Operation::Pdf))?;
    let result = run(&state, Operation::Pdf, request).await?;

    let disposition = format!("attachment; filename=\"split-{}.pdf\"", uuid::Uuid::new_v4());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, result.byte_len.to_string()),
        ],
        result.data,
    )
        .into_response())
}
