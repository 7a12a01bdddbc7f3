use anyhow::{Context, Result};

use crate::error::TelegramError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Updates the webhook subscribes to; everything else is dropped server-side.
const ALLOWED_UPDATES: [&str; 6] = [
    "message",
    "edited_message",
    "callback_query",
    "inline_query",
    "chat_member",
    "my_chat_member",
];

/// Bot API client. Cheap to clone the `Arc` it usually lives in; holds no
/// state beyond the token and a pooled HTTP client.
pub struct TelegramApi {
    bot_token: String,
    base: String,
    client: reqwest::Client,
}

/// Outbound message; `thread_id` targets a forum topic.
#[derive(Debug, Clone, Default)]
pub struct SendMessage {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub text: String,
    pub buttons: Vec<InlineButton>,
}

/// URL button rendered on an inline keyboard row.
#[derive(Debug, Clone)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

impl SendMessage {
    pub(crate) fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": self.text,
        });
        if let Some(thread_id) = self.thread_id {
            body["message_thread_id"] = thread_id.into();
        }
        if !self.buttons.is_empty() {
            let row: Vec<serde_json::Value> = self
                .buttons
                .iter()
                .map(|b| serde_json::json!({"text": b.text, "url": b.url}))
                .collect();
            body["reply_markup"] = serde_json::json!({ "inline_keyboard": [row] });
        }
        body
    }
}

impl TelegramApi {
    pub fn new(bot_token: String) -> Self {
        Self::with_base(bot_token, DEFAULT_API_BASE.to_string())
    }

    /// Point the client at a different API origin (mock servers in tests).
    pub fn with_base(bot_token: String, base: String) -> Self {
        Self {
            bot_token,
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub(crate) fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base, self.bot_token)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(TelegramError::Request {
                method: method.to_string(),
                message: format!("({status}): {err}"),
            }
            .into());
        }

        resp.json()
            .await
            .with_context(|| format!("Telegram {method} response"))
    }

    pub async fn send_message(&self, message: &SendMessage) -> Result<()> {
        self.call("sendMessage", message.to_body()).await?;
        Ok(())
    }

    /// Register `url` as the webhook target. Telegram will echo
    /// `secret_token` back on every delivery.
    pub async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<serde_json::Value> {
        self.call(
            "setWebhook",
            serde_json::json!({
                "url": url,
                "secret_token": secret_token,
                "drop_pending_updates": true,
                "allowed_updates": ALLOWED_UPDATES,
            }),
        )
        .await
    }

    pub async fn delete_webhook(&self) -> Result<serde_json::Value> {
        self.call(
            "deleteWebhook",
            serde_json::json!({ "drop_pending_updates": true }),
        )
        .await
    }

    pub async fn webhook_info(&self) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(self.api_url("getWebhookInfo"))
            .send()
            .await
            .context("Telegram getWebhookInfo request")?;
        resp.json()
            .await
            .context("Telegram getWebhookInfo response")
    }

    pub async fn health_check(&self) -> bool {
        self.client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
