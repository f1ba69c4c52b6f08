//! Notification channel.
//!
//! Delivers textual order events (new payment, order linked, order
//! approved) to a chat transport. Sends are strictly best-effort: a failure
//! is logged at the call site and never rolls back or blocks a state
//! transition.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Notification channel trait
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver `text` to the given chat
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Send a notification, swallowing and logging any failure. This is the
/// only way the services talk to the channel.
pub async fn send_best_effort(channel: &dyn NotificationChannel, chat_id: i64, text: &str) {
    if let Err(e) = channel.send(chat_id, text).await {
        tracing::warn!(chat_id, error = %e, "Notification delivery failed");
    }
}

/// Telegram Bot API channel
pub struct TelegramChannel {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    /// Create a channel for the given bot token
    pub fn new(bot_token: &str) -> Self {
        Self::with_api_base(format!("https://api.telegram.org/bot{bot_token}"))
    }

    /// Create a channel against a custom API base URL
    pub fn with_api_base(api_base: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http, api_base }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/sendMessage", self.api_base))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("sendMessage failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Notification(format!(
                "sendMessage returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// No-op channel used when no bot token is configured, and in tests
pub struct NullChannel;

#[async_trait]
impl NotificationChannel for NullChannel {
    async fn send(&self, _chat_id: i64, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingChannel {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn send(&self, _chat_id: i64, _text: &str) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Notification("transport down".into()))
        }
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        let channel = FailingChannel {
            attempts: AtomicUsize::new(0),
        };
        // Must not panic or propagate
        send_best_effort(&channel, 42, "hello").await;
        assert_eq!(channel.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn null_channel_always_succeeds() {
        assert!(NullChannel.send(1, "x").await.is_ok());
    }
}
