//! Order lifecycle handlers: creation, status, receipt intake and
//! token-gated bundle download.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::dto::{
    CreateOrderRequest, CreateOrderResponse, OrderResponse, OrderStatusResponse, PaymentDetails,
};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::delivery_service::BUNDLE_CONTENT_TYPE;

/// Create order routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/products/:slug/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route(
            "/orders/:id/receipt",
            post(submit_receipt).layer(DefaultBodyLimit::max(16 * 1024 * 1024)),
        )
}

/// Place an order for an available product
#[utoipa::path(
    post,
    path = "/products/{slug}/orders",
    context_path = "/api/v1",
    tag = "orders",
    params(("slug" = String, Path, description = "Product slug")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Product is not available"),
    )
)]
pub async fn create_order(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    let order = state
        .orders
        .create_order(&slug, request.payment_method)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            claim_code: order.claim_code,
            status: order.status,
        }),
    ))
}

/// Fetch an order's status page payload
#[utoipa::path(
    get,
    path = "/orders/{id}",
    context_path = "/api/v1",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order status", body = OrderStatusResponse),
        (status = 404, description = "Unknown order"),
    )
)]
pub async fn get_order(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderStatusResponse>> {
    let order = state.orders.get(id).await?;
    Ok(Json(OrderStatusResponse {
        order: OrderResponse::from(order),
        payment_details: PaymentDetails {
            gcash: state.config.gcash_number.clone(),
            paymaya: state.config.paymaya_number.clone(),
        },
        php_rate: state.rates.usd_to_php().await,
    }))
}

/// Upload the payment receipt for an unpaid order
#[utoipa::path(
    post,
    path = "/orders/{id}/receipt",
    context_path = "/api/v1",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Receipt accepted", body = OrderResponse),
        (status = 400, description = "No receipt file in the request"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order is not awaiting payment"),
    )
)]
pub async fn submit_receipt(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<OrderResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("receipt_image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("receipt").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read receipt upload: {e}")))?;
        if content.is_empty() {
            return Err(AppError::Validation("The receipt file is empty".into()));
        }

        let order = state
            .orders
            .submit_receipt(id, &filename, content, &content_type)
            .await?;
        return Ok(Json(OrderResponse::from(order)));
    }
    Err(AppError::Validation(
        "A receipt_image file field is required".into(),
    ))
}

/// Download a delivery bundle by bearer token
#[utoipa::path(
    get,
    path = "/download/{token}",
    tag = "orders",
    params(("token" = String, Path, description = "Download token")),
    responses(
        (status = 200, description = "Delivery bundle (ZIP)"),
        (status = 404, description = "Invalid or expired download link"),
    )
)]
pub async fn download_bundle(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Response> {
    let bundle = state.orders.fetch_bundle(&token).await?;
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, BUNDLE_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, bundle.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", bundle.filename),
        )
        .body(Body::from(bundle.data))
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {e}")))?;
    Ok(response)
}
