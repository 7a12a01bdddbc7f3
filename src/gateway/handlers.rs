use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};

use super::{AdminQuery, AppState, PublishBody};
use crate::miniapp::{StartPayload, decode_start_param};
use crate::security::{SignedParams, constant_time_eq};
use crate::telegram::Update;

fn unauthorized() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "unauthorized"})),
    )
}

fn invalid_request() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "invalid request"})),
    )
}

/// GET /health — always public (no secrets leaked)
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /telegram/webhook — inbound updates from Telegram.
///
/// Gated on the secret token Telegram echoes back from `setWebhook`. A
/// well-formed authenticated update is always acked with 200 so Telegram
/// does not redeliver it when downstream handling fails.
pub(super) async fn handle_telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Update>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let secret = &state.config.webhook.secret;
    let header_val = headers
        .get("X-Telegram-Bot-Api-Secret-Token")
        .and_then(|v| v.to_str().ok());
    match header_val {
        Some(val) if constant_time_eq(val, secret) => {}
        _ => {
            tracing::warn!("webhook delivery with missing or invalid secret token");
            return unauthorized();
        }
    }

    let Json(update) = match body {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "webhook delivery with undecodable update");
            return invalid_request();
        }
    };

    let update_id = update.update_id;
    if let Err(error) = state.bot.handle_update(update).await {
        tracing::error!(update_id, error = %error, "update handling failed");
    }

    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

/// GET /telegram/admin?key=..&op=set|delete|info — webhook registration ops.
pub(super) async fn handle_admin(
    State(state): State<AppState>,
    Query(params): Query<AdminQuery>,
) -> impl IntoResponse {
    let admin_key = &state.config.webhook.admin_key;
    let key_matches = params
        .key
        .as_deref()
        .is_some_and(|key| constant_time_eq(key, admin_key));
    if admin_key.is_empty() || !key_matches {
        tracing::warn!("admin request with missing or invalid key");
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "forbidden"})),
        );
    }

    let op = params.op.as_deref().unwrap_or("set");
    let result = match op {
        "set" => {
            if let Err(error) = state.config.ensure_public_origin() {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": error.to_string()})),
                );
            }
            state
                .api
                .set_webhook(&state.config.webhook_url(), &state.config.webhook.secret)
                .await
        }
        "delete" => state.api.delete_webhook().await,
        "info" => state.api.webhook_info().await,
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("unknown op: {other}")})),
            );
        }
    };

    match result {
        Ok(body) => (StatusCode::OK, Json(serde_json::json!({"op": op, "result": body}))),
        Err(error) => {
            tracing::error!(op, error = %error, "webhook admin op failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": "Telegram API error"})),
            )
        }
    }
}

/// POST /publish — relay a mini-app submission into its forum topic.
///
/// Pipeline: authenticate the init data, recover the start token signed into
/// it, decode the topic context, relay. Every rejection is generic; digests
/// and partial decodes stay in the logs.
pub(super) async fn handle_publish(
    State(state): State<AppState>,
    body: Result<Json<PublishBody>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let Json(publish) = match body {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "publish request with undecodable body");
            return invalid_request();
        }
    };

    if publish.message.trim().is_empty() {
        return invalid_request();
    }

    let params = SignedParams::parse(&publish.init_data);
    if !params.verify(&state.config.telegram.bot_token) {
        tracing::warn!("publish request failed init-data verification");
        return unauthorized();
    }

    let Some(payload) = params
        .get("start_param")
        .and_then(decode_start_param::<StartPayload>)
    else {
        tracing::warn!("publish request with missing or undecodable start param");
        return invalid_request();
    };

    let send = crate::telegram::SendMessage {
        chat_id: payload.chat_id,
        thread_id: Some(payload.thread_id),
        text: publish.message,
        buttons: Vec::new(),
    };
    if let Err(error) = state.api.send_message(&send).await {
        tracing::error!(
            chat_id = payload.chat_id,
            thread_id = payload.thread_id,
            error = %error,
            "relay into topic failed"
        );
        return (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": "relay failed"})),
        );
    }

    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}
