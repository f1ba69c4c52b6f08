//! HTTP-level tests driving the axum router end to end over in-memory
//! collaborators.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use common::{
    admin_token, body_bytes, body_json, file_product, get, get_auth, link_product, multipart_file,
    post_json, post_json_auth, seed_product, send, storage_has, test_app,
};

#[tokio::test]
async fn health_check_works() {
    let app = test_app();
    let response = get(app.router(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn catalog_listing_hides_reserved_products() {
    let app = test_app();
    let visible = seed_product(&app, link_product("Visible")).await;
    let reserved = seed_product(&app, link_product("Reserved")).await;
    app.orders
        .create_order(&reserved.slug, "gcash".into())
        .await
        .unwrap();

    let response = get(app.router(), "/api/v1/products").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], visible.slug);
    assert!(body["php_rate"].as_f64().is_some());

    // The reserved product's page also 404s
    let response = get(app.router(), &format!("/api/v1/products/{}", reserved.slug)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_page_does_not_leak_delivery_details() {
    let app = test_app();
    let product = seed_product(&app, file_product("Sealed", "secret.zip", b"zip")).await;

    let response = get(app.router(), &format!("/api/v1/products/{}", product.slug)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("secret.zip"));
    assert!(!text.contains("files/"));
}

#[tokio::test]
async fn category_filter_narrows_listing() {
    let app = test_app();
    let mut codm = link_product("CODM Account");
    codm.category = "codm".into();
    codm.sub_category = Some("active".into());
    seed_product(&app, codm).await;
    seed_product(&app, link_product("Checker")).await;

    let response = get(
        app.router(),
        "/api/v1/products?category=codm&sub_category=active",
    )
    .await;
    let body = body_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "CODM Account");
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = test_app();
    let response = get(app.router(), "/api/v1/admin/orders").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app.router(), "/api/v1/admin/orders", "bogus-token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        app.router(),
        "/api/v1/admin/login",
        json!({ "password": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = admin_token(&app).await;
    let response = get_auth(app.router(), "/api/v1/admin/orders", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_purchase_flow_over_http() {
    let app = test_app();
    let product = seed_product(&app, file_product("E2E Tool", "payload.txt", b"payload!")).await;
    let token = admin_token(&app).await;

    // Buyer places the order
    let response = post_json(
        app.router(),
        &format!("/api/v1/products/{}/orders", product.slug),
        json!({ "payment_method": "gcash" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let order_id = created["order_id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "unpaid");
    assert!(created["claim_code"].as_str().unwrap().starts_with("CLAIM-"));

    // Order status shows payment details
    let response = get(app.router(), &format!("/api/v1/orders/{order_id}")).await;
    let status_body = body_json(response).await;
    assert_eq!(status_body["payment_details"]["gcash"], "0912-345-6789");
    assert_eq!(status_body["status"], "unpaid");

    // Buyer uploads a receipt
    let (content_type, body) =
        multipart_file("receipt_image", "receipt.jpg", "image/jpeg", b"jpeg-bytes");
    let response = send(
        app.router(),
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/orders/{order_id}/receipt"))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "pending");

    // Admin sees it on the dashboard and approves
    let response = get_auth(app.router(), "/api/v1/admin/orders", &token).await;
    let pending = body_json(response).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let response = post_json_auth(
        app.router(),
        &format!("/api/v1/admin/orders/{order_id}/approve"),
        &token,
        json!({ "mark_as_proof": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "approved");

    // Buyer picks up the download link from the order page
    let response = get(app.router(), &format!("/api/v1/orders/{order_id}")).await;
    let status_body = body_json(response).await;
    let download_url = status_body["download_url"].as_str().unwrap().to_string();

    // First download completes the order
    let response = get(app.router(), &download_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/zip"
    );
    let first = body_bytes(response).await;

    let response = get(app.router(), &format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(body_json(response).await["status"], "completed");

    // Repeat download returns the same bytes
    let response = get(app.router(), &download_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, first);

    // The completed proof order shows on the wall
    let response = get(app.router(), "/api/v1/proofs").await;
    let proofs = body_json(response).await;
    assert_eq!(proofs.as_array().unwrap().len(), 1);
    assert_eq!(proofs[0]["product_name"], "E2E Tool");
}

#[tokio::test]
async fn bogus_download_token_is_not_found() {
    let app = test_app();
    let response = get(app.router(), "/download/no-such-token").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn receipt_upload_without_file_is_rejected() {
    let app = test_app();
    let product = seed_product(&app, link_product("Needs Receipt")).await;
    let order = app
        .orders
        .create_order(&product.slug, "gcash".into())
        .await
        .unwrap();

    let (content_type, body) = multipart_file("wrong_field", "r.jpg", "image/jpeg", b"data");
    let response = send(
        app.router(),
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/orders/{}/receipt", order.id))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_adds_and_deletes_products_via_multipart() {
    let app = test_app();
    let token = admin_token(&app).await;

    // Multi-field multipart form: metadata, link delivery, image
    let boundary = "product-form-boundary";
    let mut body = Vec::new();
    for (name, value) in [
        ("name", "Panel Access"),
        ("price", "25.00"),
        ("category", "tools"),
        ("description", "A panel"),
        ("bonus_freebies", "Free config\nPriority support"),
        ("website_link", "https://example.com/panel"),
        ("expiration_days", "30"),
    ] {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"png-bytes");
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = send(
        app.router(),
        Request::builder()
            .method("POST")
            .uri("/api/v1/admin/products")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["slug"], "panel-access");
    assert_eq!(created["delivery"]["mode"], "website_link");
    assert_eq!(created["bonus_freebies"].as_array().unwrap().len(), 2);
    let id = created["id"].as_str().unwrap().to_string();

    // The image is stored and served
    let image_url = created["image_url"].as_str().unwrap().to_string();
    let response = get(app.router(), &image_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"png-bytes");

    // Delete cascades to the stored image
    let image_key = image_url.trim_start_matches("/files/").to_string();
    assert!(storage_has(&app, &image_key).await);
    let response = send(
        app.router(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/admin/products/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!storage_has(&app, &image_key).await);

    let response = get(app.router(), "/api/v1/products/panel-access").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_edit_renames_slug() {
    let app = test_app();
    let token = admin_token(&app).await;
    let product = seed_product(&app, link_product("Old Name")).await;

    let response = send(
        app.router(),
        Request::builder()
            .method("PATCH")
            .uri(format!("/api/v1/admin/products/{}", product.id))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({ "name": "New Name" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["slug"], "new-name");

    let response = get(app.router(), "/api/v1/products/new-name").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn double_order_race_over_http_rejects_second_buyer() {
    let app = test_app();
    let product = seed_product(&app, link_product("Last Unit")).await;

    let uri = format!("/api/v1/products/{}/orders", product.slug);
    let first = post_json(app.router(), &uri, json!({ "payment_method": "gcash" })).await;
    let second = post_json(app.router(), &uri, json!({ "payment_method": "paymaya" })).await;

    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(second.status(), StatusCode::CONFLICT);
}
