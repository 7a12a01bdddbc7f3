//! CLI dispatch: maps parsed commands onto the gateway and the Telegram API.

use std::sync::Arc;

use anyhow::Result;

use crate::cli::{Cli, Commands, WebhookCommands};
use crate::config::Config;
use crate::{gateway, telegram};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { port, host } => {
            config.ensure_credentials()?;
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, Arc::new(config)).await
        }

        Commands::Webhook { webhook_command } => {
            config.ensure_credentials()?;
            let api = telegram::shared_api(&config.telegram);

            let result = match webhook_command {
                WebhookCommands::Set => {
                    config.ensure_public_origin()?;
                    let url = config.webhook_url();
                    tracing::info!(url, "registering webhook");
                    api.set_webhook(&url, &config.webhook.secret).await?
                }
                WebhookCommands::Delete => api.delete_webhook().await?,
                WebhookCommands::Info => api.webhook_info().await?,
            };

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        Commands::Status => {
            println!("Config: {}", config.config_path.display());
            println!(
                "  Bot token:     {}",
                if config.telegram.bot_token.trim().is_empty() {
                    "missing"
                } else {
                    "configured"
                }
            );
            println!(
                "  Bot username:  {}",
                if config.telegram.bot_username.is_empty() {
                    "missing"
                } else {
                    config.telegram.bot_username.as_str()
                }
            );
            println!("  Mini app:      {}", config.telegram.app_short_name);
            println!("  Backend:       {}", config.backend.base_url);
            println!(
                "  Public origin: {}",
                if config.webhook.public_origin.is_empty() {
                    "missing"
                } else {
                    config.webhook.public_origin.as_str()
                }
            );

            if config.ensure_credentials().is_ok() {
                let api = telegram::shared_api(&config.telegram);
                let reachable = api.health_check().await;
                println!(
                    "  Telegram API:  {}",
                    if reachable { "reachable" } else { "unreachable" }
                );
            }
            Ok(())
        }
    }
}
