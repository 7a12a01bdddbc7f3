pub mod schema;

pub use schema::{BackendConfig, Config, GatewayConfig, SecretsConfig, TelegramConfig, WebhookConfig};
