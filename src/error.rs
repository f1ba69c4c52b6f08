//! Application error types and result alias.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Not found error (unknown product, order, token or claim code)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Operation attempted outside its guard state
    /// (e.g. approving an order that is not `pending`)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Uniqueness conflict (e.g. claim code or download token collision)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (missing or contradictory input fields)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persistence collaborator failure; in-memory state is left untouched
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// Asset storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Notification channel failure; swallowed and logged at the call site,
    /// never propagated past it
    #[error("Notification error: {0}")]
    Notification(String),

    /// Archive assembly error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address parse error
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", msg.clone()),
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Datastore(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATASTORE_ERROR",
                msg.clone(),
            ),
            AppError::Storage(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                msg.clone(),
            ),
            AppError::Notification(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOTIFICATION_ERROR",
                msg.clone(),
            ),
            AppError::Archive(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ARCHIVE_ERROR",
                "Bundle assembly failed".to_string(),
            ),
            AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                "IO operation failed".to_string(),
            ),
            AppError::AddrParse(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ADDR_PARSE_ERROR",
                "Invalid address".to_string(),
            ),
            AppError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "JSON_ERROR",
                "Invalid JSON".to_string(),
            ),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "JWT_ERROR", "Invalid token".to_string()),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        // Log the error
        tracing::error!(error = %self, code = code, "Request error");

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
