//! Route definitions for the API.

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::admin_middleware;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    let openapi = super::openapi::build_openapi();

    Router::new()
        // Health endpoint (no auth required)
        .route("/health", get(handlers::health::health_check))
        // OpenAPI spec and Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", openapi))
        // API v1 routes
        .nest("/api/v1", api_v1_routes(state.clone()))
        // Token-gated bundle download, addressed directly from chat links
        .route("/download/:token", get(handlers::orders::download_bundle))
        // Public images and receipts
        .nest("/files", handlers::files::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        // Public storefront and order routes
        .merge(handlers::shop::router())
        .merge(handlers::orders::router())
        // Admin login (public) and back office (session required)
        .nest("/admin", handlers::admin::public_router())
        .nest(
            "/admin",
            handlers::admin::protected_router().layer(middleware::from_fn_with_state(
                state.auth.clone(),
                admin_middleware,
            )),
        )
}
