//! Axum HTTP gateway fronting the bot webhook and the mini-app publish API.
//!
//! Request parsing, Content-Length validation, and header sanitization are
//! handled by axum/hyper; this module adds body limits, timeouts, CORS for
//! the mini-app origin, and the authentication gates on each route.

mod handlers;
mod server;


pub use server::{run_gateway, run_gateway_with_listener};

use crate::config::Config;
use crate::telegram::{RelayBot, TelegramApi};
use std::sync::Arc;

/// Maximum request body size (64KB) -- prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) -- prevents slow-loris attacks
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api: Arc<TelegramApi>,
    pub bot: Arc<RelayBot>,
}

/// Publish request body. The mini app sends camelCase; accept both.
#[derive(serde::Deserialize, serde::Serialize)]
pub struct PublishBody {
    #[serde(alias = "initData")]
    pub init_data: String,
    pub message: String,
}

/// Webhook admin query params
#[derive(serde::Deserialize)]
pub struct AdminQuery {
    pub key: Option<String>,
    pub op: Option<String>,
}
