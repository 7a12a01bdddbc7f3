//! Telegram Bot API surface: typed client, update records, command flow.

pub mod api;
pub mod bot;
pub mod update;


pub use api::{InlineButton, SendMessage, TelegramApi};
pub use bot::RelayBot;
pub use update::{BotCommand, Chat, Message, Update, User, parse_command};

use crate::config::TelegramConfig;
use std::sync::{Arc, OnceLock};

static SHARED_API: OnceLock<Arc<TelegramApi>> = OnceLock::new();

/// Process-wide API handle. Built once from the first caller's config and
/// shared read-only afterwards; later calls with a different token get the
/// original handle.
pub fn shared_api(config: &TelegramConfig) -> Arc<TelegramApi> {
    Arc::clone(SHARED_API.get_or_init(|| Arc::new(TelegramApi::new(config.bot_token.clone()))))
}
