//! The `/add` command flow: validate a forum topic against the backend, then
//! hand the requester a mini-app deep link pre-loaded with signed context.

use std::sync::Arc;

use anyhow::Result;

use super::api::{InlineButton, SendMessage, TelegramApi};
use super::update::{BotCommand, Message, Update, parse_command};
use crate::backend::{BackendClient, ValidateOutcome, ValidateRequest};
use crate::config::Config;
use crate::miniapp::encode_start_param;

/// Deep link opening the mini app with an opaque start token.
/// The token alphabet is URL-safe, so no escaping is needed.
pub fn mini_app_link(bot_username: &str, app_short_name: &str, token: &str) -> String {
    format!("https://t.me/{bot_username}/{app_short_name}?startapp={token}")
}

/// Update-handling half of the relay: everything the webhook needs, bundled.
pub struct RelayBot {
    api: Arc<TelegramApi>,
    backend: BackendClient,
    bot_username: String,
    app_short_name: String,
}

impl RelayBot {
    pub fn new(api: Arc<TelegramApi>, backend: BackendClient, config: &Config) -> Self {
        Self {
            api,
            backend,
            bot_username: config.telegram.bot_username.clone(),
            app_short_name: config.telegram.app_short_name.clone(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let api = super::shared_api(&config.telegram);
        let backend = BackendClient::new(config.backend.base_url.clone());
        Self::new(api, backend, config)
    }

    /// Entry point for webhook deliveries. Errors here are operational
    /// (Telegram or backend unreachable); malformed updates never get this
    /// far and uninteresting ones are ignored.
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        let Some(message) = update.message else {
            tracing::debug!(update_id = update.update_id, "update without message ignored");
            return Ok(());
        };

        match message.text.as_deref().and_then(parse_command) {
            Some(BotCommand::Add) => self.handle_add(&message).await,
            None => {
                tracing::debug!(chat_id = message.chat.id, "non-command message ignored");
                Ok(())
            }
        }
    }

    async fn handle_add(&self, message: &Message) -> Result<()> {
        let chat_id = message.chat.id;
        let (Some(from), Some(thread_id)) = (message.from.as_ref(), message.message_thread_id)
        else {
            return self
                .reply(chat_id, None, "Use /add inside a forum topic.")
                .await;
        };

        let request = ValidateRequest {
            chat_id: chat_id.to_string(),
            thread_id,
            user_id: from.id.to_string(),
        };

        match self.backend.validate_topic(&request).await {
            Ok(ValidateOutcome::Approved(context)) => {
                let payload = context.into_start_payload(message.chat.title.as_deref());
                let token = encode_start_param(&payload)?;
                let link = mini_app_link(&self.bot_username, &self.app_short_name, &token);

                let send = SendMessage {
                    chat_id,
                    thread_id: Some(thread_id),
                    text: "Open the mini app to submit a new entry for this topic.".into(),
                    buttons: vec![InlineButton {
                        text: "🚀 New entry".into(),
                        url: link,
                    }],
                };
                self.api.send_message(&send).await
            }
            Ok(ValidateOutcome::Rejected { message: reason, details }) => {
                tracing::info!(chat_id, thread_id, reason, "topic validation rejected");
                let mut text = format!("❌ {reason}");
                for detail in &details {
                    text.push_str("\n• ");
                    text.push_str(detail);
                }
                self.reply(chat_id, Some(thread_id), &text).await
            }
            Err(error) => {
                tracing::error!(chat_id, thread_id, error = %error, "backend validation call failed");
                self.reply(
                    chat_id,
                    Some(thread_id),
                    "Could not reach the validation service. Try again later.",
                )
                .await
            }
        }
    }

    async fn reply(&self, chat_id: i64, thread_id: Option<i64>, text: &str) -> Result<()> {
        self.api
            .send_message(&SendMessage {
                chat_id,
                thread_id,
                text: text.to_string(),
                buttons: Vec::new(),
            })
            .await
    }
}
