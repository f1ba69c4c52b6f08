//! Admin back-office handlers: login, order review and product management.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::dto::{
    AdminOrderResponse, AdminProductResponse, ApproveOrderRequest, LoginRequest, LoginResponse,
};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::catalog_service::{NewProduct, ProductUpdate, Upload};

/// Routes reachable without a session: login only
pub fn public_router() -> Router<SharedState> {
    Router::new().route("/login", post(login))
}

/// Routes gated by the admin middleware
pub fn protected_router() -> Router<SharedState> {
    Router::new()
        .route("/orders", get(list_pending_orders))
        .route("/orders/:id/approve", post(approve_order))
        .route(
            "/products",
            get(list_all_products).post(add_product).layer(
                // Product uploads carry an image plus the deliverable file.
                DefaultBodyLimit::max(64 * 1024 * 1024),
            ),
        )
        .route(
            "/products/:id",
            axum::routing::patch(update_product).delete(delete_product),
        )
}

/// Exchange the admin password for a session token
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/admin",
    tag = "admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = LoginResponse),
        (status = 401, description = "Wrong password"),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let access_token = state.auth.login(&request.password)?;
    Ok(Json(LoginResponse { access_token }))
}

/// Orders awaiting review, newest first
#[utoipa::path(
    get,
    path = "/orders",
    context_path = "/api/v1/admin",
    tag = "admin",
    responses(
        (status = 200, description = "Pending orders", body = [AdminOrderResponse]),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_pending_orders(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AdminOrderResponse>>> {
    let orders = state.orders.list_pending().await;
    Ok(Json(
        orders.into_iter().map(AdminOrderResponse::from).collect(),
    ))
}

/// Approve a pending order: packages the bundle, mints the download token
/// and releases the product
#[utoipa::path(
    post,
    path = "/orders/{id}/approve",
    context_path = "/api/v1/admin",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ApproveOrderRequest,
    responses(
        (status = 200, description = "Order approved", body = AdminOrderResponse),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Order is not pending"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_order(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    request: Option<Json<ApproveOrderRequest>>,
) -> Result<Json<AdminOrderResponse>> {
    let mark_as_proof = request.map(|Json(r)| r.mark_as_proof).unwrap_or(false);
    let order = state.orders.approve(id, mark_as_proof).await?;
    Ok(Json(AdminOrderResponse::from(order)))
}

/// Every product, including reserved ones
#[utoipa::path(
    get,
    path = "/products",
    context_path = "/api/v1/admin",
    tag = "admin",
    responses(
        (status = 200, description = "All products", body = [AdminProductResponse]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_all_products(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AdminProductResponse>>> {
    let products = state.catalog.list().await;
    Ok(Json(
        products.into_iter().map(AdminProductResponse::from).collect(),
    ))
}

/// Add a product from a multipart form
#[utoipa::path(
    post,
    path = "/products",
    context_path = "/api/v1/admin",
    tag = "admin",
    responses(
        (status = 201, description = "Product added", body = AdminProductResponse),
        (status = 400, description = "Missing or contradictory fields"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_product(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AdminProductResponse>)> {
    let new = parse_product_form(multipart).await?;
    let product = state.catalog.add_product(new).await?;
    Ok((StatusCode::CREATED, Json(AdminProductResponse::from(product))))
}

/// Edit a product's fields
#[utoipa::path(
    patch,
    path = "/products/{id}",
    context_path = "/api/v1/admin",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Product updated", body = AdminProductResponse),
        (status = 404, description = "Unknown product"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ProductUpdate>,
) -> Result<Json<AdminProductResponse>> {
    let product = state.catalog.update_product(id, changes).await?;
    Ok(Json(AdminProductResponse::from(product)))
}

/// Delete a product and release its assets
#[utoipa::path(
    delete,
    path = "/products/{id}",
    context_path = "/api/v1/admin",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Unknown product"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collect the multipart product form into a [`NewProduct`].
async fn parse_product_form(mut multipart: Multipart) -> Result<NewProduct> {
    let mut new = NewProduct {
        name: String::new(),
        price: String::new(),
        category: String::new(),
        sub_category: None,
        description: String::new(),
        bonus_freebies: Vec::new(),
        image: None,
        asset_file: None,
        website_link: None,
        expiration_days: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" | "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read {name} upload: {e}"))
                })?;
                if content.is_empty() {
                    continue;
                }
                let upload: Upload = (filename, content, content_type);
                if name == "image" {
                    new.image = Some(upload);
                } else {
                    new.asset_file = Some(upload);
                }
            }
            _ => {
                let value = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read {name} field: {e}"))
                })?;
                match name.as_str() {
                    "name" => new.name = value,
                    "price" => new.price = value,
                    "category" => new.category = value,
                    "sub_category" if !value.is_empty() => new.sub_category = Some(value),
                    "description" => new.description = value,
                    "bonus_freebies" => {
                        new.bonus_freebies = value
                            .lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty())
                            .map(str::to_string)
                            .collect();
                    }
                    "website_link" if !value.is_empty() => new.website_link = Some(value),
                    "expiration_days" if !value.is_empty() => {
                        new.expiration_days = Some(value.parse().map_err(|_| {
                            AppError::Validation("expiration_days must be a number".into())
                        })?);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(new)
}
