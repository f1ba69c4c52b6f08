//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto;
use super::handlers;
use crate::models::{DeliveryMode, OrderStatus, ProductStatus};
use crate::services::catalog_service::ProductUpdate;

/// Top-level OpenAPI document for the storefront API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "Digital-goods storefront with order claiming and token-gated delivery.",
        version = "0.1.0",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Current server"),
    ),
    modifiers(&SecurityAddon),
    paths(
        handlers::health::health_check,
        handlers::shop::list_products,
        handlers::shop::get_product,
        handlers::shop::list_proofs,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::submit_receipt,
        handlers::orders::download_bundle,
        handlers::files::serve_image,
        handlers::files::serve_receipt,
        handlers::admin::login,
        handlers::admin::list_pending_orders,
        handlers::admin::approve_order,
        handlers::admin::list_all_products,
        handlers::admin::add_product,
        handlers::admin::update_product,
        handlers::admin::delete_product,
    ),
    components(schemas(
        dto::ProductResponse,
        dto::AdminProductResponse,
        dto::OrderResponse,
        dto::AdminOrderResponse,
        dto::OrderStatusResponse,
        dto::ProofResponse,
        dto::CreateOrderRequest,
        dto::CreateOrderResponse,
        dto::ApproveOrderRequest,
        dto::LoginRequest,
        dto::LoginResponse,
        dto::PaymentDetails,
        handlers::shop::ProductListResponse,
        handlers::shop::ProductPageResponse,
        ProductUpdate,
        ProductStatus,
        OrderStatus,
        DeliveryMode,
        ErrorResponse,
    )),
    tags(
        (name = "shop", description = "Public catalog and proof wall"),
        (name = "orders", description = "Order lifecycle and bundle download"),
        (name = "admin", description = "Back-office order review and product management"),
        (name = "files", description = "Public image and receipt serving"),
        (name = "health", description = "Health checks"),
    )
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "INVALID_STATE")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Registers the bearer security scheme used by admin routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the OpenAPI document served next to the Swagger UI.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
