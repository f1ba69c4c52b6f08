//! Public file serving: product images and payment receipts.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::api::SharedState;
use crate::error::{AppError, Result};

/// Create file-serving routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/images/:name", get(serve_image))
        .route("/receipts/:name", get(serve_receipt))
}

/// Serve a product image
#[utoipa::path(
    get,
    path = "/images/{name}",
    context_path = "/files",
    tag = "files",
    params(("name" = String, Path, description = "Image object name")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Unknown image"),
    )
)]
pub async fn serve_image(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Response> {
    serve(&state, &format!("images/{name}")).await
}

/// Serve a payment receipt
#[utoipa::path(
    get,
    path = "/receipts/{name}",
    context_path = "/files",
    tag = "files",
    params(("name" = String, Path, description = "Receipt object name")),
    responses(
        (status = 200, description = "Receipt bytes"),
        (status = 404, description = "Unknown receipt"),
    )
)]
pub async fn serve_receipt(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Response> {
    serve(&state, &format!("receipts/{name}")).await
}

async fn serve(state: &SharedState, key: &str) -> Result<Response> {
    let object = state.storage.get(key).await?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, object.content_type)
        .header(header::CONTENT_LENGTH, object.data.len())
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(format!("Failed to build file response: {e}")))
}
