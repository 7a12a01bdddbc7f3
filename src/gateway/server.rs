use super::handlers::{handle_admin, handle_health, handle_publish, handle_telegram_webhook};
use super::{AppState, MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS};

use crate::config::Config;
use crate::error::GatewayError;
use crate::telegram::{self, RelayBot};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Returns true when the bind address is not a loopback address.
fn is_public_bind(host: &str) -> bool {
    !matches!(
        host,
        "127.0.0.1" | "localhost" | "::1" | "[::1]" | "0:0:0:0:0:0:0:1"
    )
}

/// Run the HTTP gateway using axum with proper HTTP/1.1 compliance.
pub async fn run_gateway(host: &str, port: u16, config: Arc<Config>) -> Result<()> {
    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(host) && !config.gateway.allow_public_bind {
        return Err(GatewayError::PublicBind(format!(
            "{host} — use --host 127.0.0.1 (default) behind a reverse proxy, or set \
             [gateway] allow_public_bind = true in config.toml"
        ))
        .into());
    }

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parse gateway bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind gateway socket")?;

    run_gateway_with_listener(host, listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    host: &str,
    listener: tokio::net::TcpListener,
    config: Arc<Config>,
) -> Result<()> {
    let actual_port = listener
        .local_addr()
        .context("get gateway listener local address")?
        .port();
    let display_addr = format!("{host}:{actual_port}");

    let state = build_gateway_state(&config);

    print_gateway_banner(&display_addr, &config);

    let app = build_app(state, &config.gateway.cors_origins);
    axum::serve(listener, app)
        .await
        .context("serve HTTP gateway")?;

    Ok(())
}

fn build_gateway_state(config: &Arc<Config>) -> AppState {
    let api = telegram::shared_api(&config.telegram);
    let bot = Arc::new(RelayBot::from_config(config));

    AppState {
        config: Arc::clone(config),
        api,
        bot,
    }
}

fn print_gateway_banner(display_addr: &str, config: &Config) {
    println!("Gateway listening on {display_addr}");
    println!("  POST /telegram/webhook");
    println!("  GET  /telegram/admin");
    println!("  POST /publish");
    println!("  GET  /health");
    if config.webhook.public_origin.is_empty() {
        println!("  Webhook origin not configured — run `threadline webhook set` after setting it");
    } else {
        println!("  Webhook target: {}", config.webhook_url());
    }
}

pub(super) fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/telegram/webhook", post(handle_telegram_webhook))
        .route("/telegram/admin", get(handle_admin))
        .route("/publish", post(handle_publish))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ));

    if !cors_origins.is_empty() {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        );
    }

    app
}
