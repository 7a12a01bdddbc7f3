use clap::{Parser, Subcommand};

/// `Threadline` — Telegram Mini App relay bridging forum topics to a backend API.
#[derive(Parser, Debug)]
#[command(name = "threadline")]
#[command(version = "0.1.0")]
#[command(about = "Relay between a Telegram bot, its mini app, and a backend API.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway (bot webhook + mini-app publish API)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Manage the webhook registration with Telegram
    Webhook {
        #[command(subcommand)]
        webhook_command: WebhookCommands,
    },

    /// Show configuration summary and Telegram API reachability
    Status,
}

/// Webhook registration subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookCommands {
    /// Register the webhook URL derived from the configured public origin
    Set,
    /// Remove the webhook registration
    Delete,
    /// Show the current webhook registration
    Info,
}
