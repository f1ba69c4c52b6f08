//! Common test utilities for integration tests.
//!
//! Builds the full application over in-memory collaborators so tests are
//! deterministic and need no external services.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use storefront_backend::api::{routes, AppState, SharedState};
use storefront_backend::config::Config;
use storefront_backend::datastore::memory::MemoryStore;
use storefront_backend::models::Product;
use storefront_backend::services::catalog_service::{CatalogService, NewProduct};
use storefront_backend::services::notify_service::NullChannel;
use storefront_backend::services::order_service::OrderService;
use storefront_backend::storage::memory::MemoryStorage;
use storefront_backend::storage::StorageBackend;

pub const ADMIN_PASSWORD: &str = "test-admin-password";

/// Test application with handles to its collaborators
pub struct TestApp {
    pub state: SharedState,
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        log_level: "debug".into(),
        public_base_url: "http://localhost:8080".into(),
        datastore_path: "/unused".into(),
        storage_path: "/unused".into(),
        admin_password: ADMIN_PASSWORD.into(),
        jwt_secret: "test-jwt-secret".into(),
        telegram_bot_token: None,
        admin_chat_id: None,
        gcash_number: Some("0912-345-6789".into()),
        paymaya_number: None,
        currency_endpoint: "http://rates.invalid/latest/USD".into(),
        currency_fallback_rate: 58.0,
    }
}

/// Build a test app over in-memory store, storage and a null notifier.
pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let catalog = Arc::new(CatalogService::new(store.clone(), storage.clone()));
    let orders = Arc::new(OrderService::new(
        store,
        catalog.clone(),
        storage.clone(),
        Arc::new(NullChannel),
        None,
        "http://localhost:8080".into(),
    ));
    let state = Arc::new(AppState::new(
        test_config(),
        catalog.clone(),
        orders.clone(),
        storage.clone(),
    ));
    TestApp {
        state,
        catalog,
        orders,
        storage,
    }
}

/// A website-link product request
pub fn link_product(name: &str) -> NewProduct {
    NewProduct {
        name: name.into(),
        price: "15.00".into(),
        category: "web_checker".into(),
        sub_category: None,
        description: "test product".into(),
        bonus_freebies: vec![],
        image: Some((
            "cover.png".into(),
            Bytes::from_static(b"png-bytes"),
            "image/png".into(),
        )),
        asset_file: None,
        website_link: Some("https://example.com/panel".into()),
        expiration_days: Some(30),
    }
}

/// A file-delivery product request carrying `payload` as its asset
pub fn file_product(name: &str, filename: &str, payload: &'static [u8]) -> NewProduct {
    NewProduct {
        asset_file: Some((
            filename.into(),
            Bytes::from_static(payload),
            "text/plain".into(),
        )),
        website_link: None,
        expiration_days: None,
        ..link_product(name)
    }
}

/// Seed a product straight through the catalog service.
pub async fn seed_product(app: &TestApp, new: NewProduct) -> Product {
    app.catalog.add_product(new).await.expect("seed product")
}

/// Send a request through the router and return the response.
pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.expect("router call")
}

/// GET helper
pub async fn get(router: Router, uri: &str) -> Response<Body> {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

/// POST a JSON body
pub async fn post_json(router: Router, uri: &str, body: Value) -> Response<Body> {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// POST a JSON body with a bearer token
pub async fn post_json_auth(router: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// GET with a bearer token
pub async fn get_auth(router: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        router,
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Log in through the API and return the admin session token.
pub async fn admin_token(app: &TestApp) -> String {
    let response = post_json(
        app.router(),
        "/api/v1/admin/login",
        serde_json::json!({ "password": ADMIN_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

/// Build a single-file multipart body plus its content-type header value.
pub fn multipart_file(
    field: &str,
    filename: &str,
    content_type: &str,
    content: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "test-boundary-7a3f9c";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={boundary}"),
        body,
    )
}

/// Ensure a storage object exists (used to assert asset cascades).
pub async fn storage_has(app: &TestApp, key: &str) -> bool {
    app.storage.exists(key).await.expect("storage exists")
}
