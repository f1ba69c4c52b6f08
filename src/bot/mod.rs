//! Telegram bot worker.
//!
//! Long-polls the Bot API for messages and handles two commands: `/start`
//! (welcome text) and `/claim <code>` (pair the chat with a web order via
//! the claim registry). Runs as a background task; transient transport
//! errors restart the polling loop after a short pause.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::services::notify_service::{send_best_effort, TelegramChannel};
use crate::services::order_service::OrderService;

/// Long-poll window requested from the Bot API
const POLL_TIMEOUT_SECS: u64 = 25;

/// Pause before restarting the loop after a transport error
const RETRY_PAUSE: Duration = Duration::from_secs(10);

const WELCOME_TEXT: &str = "Welcome! To link an order, please find your unique \
/claim command on the order page of our website.";

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
}

/// Telegram bot worker
pub struct BotWorker {
    http: reqwest::Client,
    api_base: String,
    channel: TelegramChannel,
    orders: Arc<OrderService>,
}

impl BotWorker {
    pub fn new(bot_token: &str, orders: Arc<OrderService>) -> Self {
        let http = reqwest::Client::builder()
            // Comfortably above the long-poll window.
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            channel: TelegramChannel::new(bot_token),
            orders,
        }
    }

    /// Spawn the polling loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Starting Telegram bot listener");
            self.run().await;
        })
    }

    async fn run(self) {
        let mut offset: i64 = 0;
        loop {
            match self.poll(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            self.handle_message(message).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Bot polling error, restarting");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }

    async fn poll(&self, offset: i64) -> Result<Vec<Update>> {
        let resp = self
            .http
            .get(format!("{}/getUpdates", self.api_base))
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("getUpdates failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Notification(format!("getUpdates returned {e}")))?;

        let updates: UpdatesResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("malformed getUpdates body: {e}")))?;
        Ok(updates.result)
    }

    async fn handle_message(&self, message: Message) {
        let chat_id = message.chat.id;
        let Some(text) = message.text else { return };
        let text = text.trim();

        if text.starts_with("/start") {
            send_best_effort(&self.channel, chat_id, WELCOME_TEXT).await;
            return;
        }

        if text.to_lowercase().starts_with("/claim") {
            let username = message.from.and_then(|u| u.username);
            self.handle_claim(chat_id, text, username).await;
        }
    }

    async fn handle_claim(&self, chat_id: i64, text: &str, username: Option<String>) {
        let Some(code) = text.split_whitespace().nth(1) else {
            send_best_effort(
                &self.channel,
                chat_id,
                "\u{274C} Error: Invalid command format. Please use: /claim YOUR_CODE",
            )
            .await;
            return;
        };

        match self.orders.claim(code, chat_id, username).await {
            Ok(order) => {
                let reply = format!(
                    "\u{2705} Success! Your Telegram account has been linked to the \
                     order for '{}'. You will receive your file here as soon as \
                     payment is approved.",
                    order.product_name
                );
                send_best_effort(&self.channel, chat_id, &reply).await;
            }
            Err(AppError::NotFound(_)) => {
                send_best_effort(
                    &self.channel,
                    chat_id,
                    "\u{274C} Error: Invalid claim code. Please copy the command \
                     exactly from your order page.",
                )
                .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Claim handling failed");
                send_best_effort(
                    &self.channel,
                    chat_id,
                    "An unexpected server error occurred. Please try again or contact support.",
                )
                .await;
            }
        }
    }
}
