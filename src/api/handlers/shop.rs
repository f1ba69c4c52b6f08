//! Public storefront handlers: catalog browsing and the proof wall.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::dto::{ProductResponse, ProofResponse};
use crate::api::SharedState;
use crate::error::{AppError, Result};

/// Create storefront routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .route("/proofs", get(list_proofs))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    /// Narrow to one category
    pub category: Option<String>,
    /// Narrow to one sub-category
    pub sub_category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListResponse {
    pub items: Vec<ProductResponse>,
    /// USD to PHP display rate
    pub php_rate: f64,
}

/// List available products
#[utoipa::path(
    get,
    path = "/products",
    context_path = "/api/v1",
    tag = "shop",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Available products", body = ProductListResponse),
    )
)]
pub async fn list_products(
    State(state): State<SharedState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductListResponse>> {
    let products = state
        .catalog
        .list_available(query.category.as_deref(), query.sub_category.as_deref())
        .await;
    Ok(Json(ProductListResponse {
        items: products.into_iter().map(ProductResponse::from).collect(),
        php_rate: state.rates.usd_to_php().await,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPageResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub php_rate: f64,
}

/// Fetch one available product by slug
#[utoipa::path(
    get,
    path = "/products/{slug}",
    context_path = "/api/v1",
    tag = "shop",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product details", body = ProductPageResponse),
        (status = 404, description = "Unknown or unavailable product"),
    )
)]
pub async fn get_product(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductPageResponse>> {
    let product = state
        .catalog
        .get_by_slug(&slug)
        .await
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))?;
    // Reserved products are hidden from the storefront.
    if product.status != crate::models::ProductStatus::Available {
        return Err(AppError::NotFound(format!("product '{slug}'")));
    }
    Ok(Json(ProductPageResponse {
        product: ProductResponse::from(product),
        php_rate: state.rates.usd_to_php().await,
    }))
}

/// Completed orders published as payment proofs, newest first
#[utoipa::path(
    get,
    path = "/proofs",
    context_path = "/api/v1",
    tag = "shop",
    responses(
        (status = 200, description = "Proof wall entries", body = [ProofResponse]),
    )
)]
pub async fn list_proofs(State(state): State<SharedState>) -> Result<Json<Vec<ProofResponse>>> {
    let proofs = state
        .orders
        .list_proofs()
        .await
        .into_iter()
        .filter_map(|order| {
            order.receipt_key.map(|key| ProofResponse {
                product_name: order.product_name,
                receipt_url: format!("/files/{key}"),
                created_at: order.created_at,
            })
        })
        .collect();
    Ok(Json(proofs))
}
