//! Inbound update records, narrowed to the fields this service consumes.
//!
//! Everything optional on the wire stays `Option` here; an update missing a
//! field the flow needs is handled at the boundary instead of leaking an
//! undefined value deeper in.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message_thread_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Commands the bot reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Open the mini app for the current forum topic.
    Add,
}

/// Parse the leading bot command from message text, tolerating the
/// `@BotName` suffix Telegram appends in group chats.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let command = command.split('@').next().unwrap_or(command);
    match command {
        "add" => Some(BotCommand::Add),
        _ => None,
    }
}
