//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// Public base URL used when rendering download links in notifications
    pub public_base_url: String,

    /// Root directory for the filesystem record store
    pub datastore_path: String,

    /// Root directory for the filesystem asset storage
    pub storage_path: String,

    /// Admin password checked at login
    pub admin_password: String,

    /// HS256 secret for signing admin session tokens
    pub jwt_secret: String,

    /// Telegram bot token (bot features disabled when unset)
    pub telegram_bot_token: Option<String>,

    /// Telegram chat id that receives admin notifications
    pub admin_chat_id: Option<i64>,

    /// GCash reference number shown on the order page
    pub gcash_number: Option<String>,

    /// PayMaya reference number shown on the order page
    pub paymaya_number: Option<String>,

    /// Currency rate endpoint (USD base)
    pub currency_endpoint: String,

    /// Fallback USD to PHP rate used until the first successful fetch
    pub currency_fallback_rate: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            datastore_path: env::var("DATASTORE_PATH")
                .unwrap_or_else(|_| "/var/lib/storefront/data".into()),
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "/var/lib/storefront/files".into()),
            admin_password: env::var("ADMIN_PASSWORD")
                .map_err(|_| AppError::Config("ADMIN_PASSWORD not set".into()))?,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::Config("JWT_SECRET not set".into()))?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            admin_chat_id: env::var("ADMIN_TELEGRAM_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok()),
            gcash_number: env::var("GCASH_NUMBER").ok(),
            paymaya_number: env::var("PAYMAYA_NUMBER").ok(),
            currency_endpoint: env::var("CURRENCY_ENDPOINT").unwrap_or_else(|_| {
                "https://api.exchangerate-api.com/v4/latest/USD".into()
            }),
            currency_fallback_rate: env::var("CURRENCY_FALLBACK_RATE")
                .unwrap_or_else(|_| "58.0".into())
                .parse()
                .unwrap_or(58.0),
        })
    }
}

// Secrets stay out of log output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("datastore_path", &self.datastore_path)
            .field("storage_path", &self.storage_path)
            .field("admin_password", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("admin_chat_id", &self.admin_chat_id)
            .field("gcash_number", &self.gcash_number)
            .field("paymaya_number", &self.paymaya_number)
            .field("currency_endpoint", &self.currency_endpoint)
            .field("currency_fallback_rate", &self.currency_fallback_rate)
            .finish()
    }
}
