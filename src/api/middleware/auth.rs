//! Admin authentication middleware.
//!
//! Validates the `Authorization: Bearer <token>` session token issued by
//! the admin login endpoint and gates every back-office route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::auth_service::{AuthService, Claims};

/// Extension holding the validated admin session
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

/// Extract a bearer token from the Authorization header
fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Admin middleware function - requires a valid admin session token
pub async fn admin_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(&request) else {
        return unauthorized("Authentication required");
    };

    match auth_service.validate(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AdminSession { claims });
            next.run(request).await
        }
        Err(_) => unauthorized("Invalid or expired token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "code": "AUTH_ERROR",
            "message": message,
        })),
    )
        .into_response()
}
