//! End-to-end relay flow: a `/add` command in a forum topic gets validated
//! against the backend and answered with a mini-app deep link whose start
//! token decodes back to the topic context.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use threadline::backend::BackendClient;
use threadline::config::Config;
use threadline::miniapp::{StartPayload, decode_start_param};
use threadline::telegram::{RelayBot, TelegramApi, Update};

const BOT_TOKEN: &str = "123:TESTTOKEN";

fn test_config(backend_url: &str) -> Config {
    let mut config = Config::default();
    config.telegram.bot_token = BOT_TOKEN.into();
    config.telegram.bot_username = "examplebot".into();
    config.telegram.app_short_name = "relay".into();
    config.backend.base_url = backend_url.into();
    config
}

fn test_bot(telegram_url: &str, backend_url: &str) -> RelayBot {
    let config = test_config(backend_url);
    let api = Arc::new(TelegramApi::with_base(BOT_TOKEN.into(), telegram_url.into()));
    let backend = BackendClient::new(backend_url.into());
    RelayBot::new(api, backend, &config)
}

fn add_command_update(thread_id: Option<i64>) -> Update {
    let mut message = serde_json::json!({
        "chat": {"id": -100123, "title": "Reseller group", "type": "supergroup"},
        "from": {"id": 777, "username": "alice"},
        "text": "/add"
    });
    if let Some(thread_id) = thread_id {
        message["message_thread_id"] = thread_id.into();
    }
    serde_json::from_value(serde_json::json!({"update_id": 1, "message": message})).unwrap()
}

fn sent_message_body(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn add_in_forum_topic_replies_with_decodable_deep_link() {
    let telegram = MockServer::start().await;
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/miniapp/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "chat_id": -100123,
                "thread_id": 42,
                "chat_title": "Reseller group",
                "topic_name": "Deposits",
                "bank": {"id": 7, "name": "First National"}
            }
        })))
        .expect(1)
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{BOT_TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&telegram)
        .await;

    let bot = test_bot(&telegram.uri(), &backend.uri());
    bot.handle_update(add_command_update(Some(42))).await.unwrap();

    // Pull the reply Telegram received and decode the deep link token.
    let requests = telegram.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = sent_message_body(&requests[0]);

    assert_eq!(body["chat_id"], -100_123);
    assert_eq!(body["message_thread_id"], 42);

    let url = body["reply_markup"]["inline_keyboard"][0][0]["url"]
        .as_str()
        .unwrap();
    let prefix = "https://t.me/examplebot/relay?startapp=";
    assert!(url.starts_with(prefix), "unexpected deep link: {url}");

    let token = &url[prefix.len()..];
    let payload: StartPayload = decode_start_param(token).unwrap();
    assert_eq!(payload.chat_id, -100_123);
    assert_eq!(payload.thread_id, 42);
    assert_eq!(payload.chat_title, "Reseller group");
    assert_eq!(payload.topic_name.as_deref(), Some("Deposits"));
    assert_eq!(payload.bank.unwrap().id, 7);
}

#[tokio::test]
async fn add_outside_forum_topic_gets_usage_guidance() {
    let telegram = MockServer::start().await;
    let backend = MockServer::start().await;

    // No backend call expected at all.
    Mock::given(method("POST"))
        .and(path("/miniapp/validate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{BOT_TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&telegram)
        .await;

    let bot = test_bot(&telegram.uri(), &backend.uri());
    bot.handle_update(add_command_update(None)).await.unwrap();

    let requests = telegram.received_requests().await.unwrap();
    let body = sent_message_body(&requests[0]);
    let text = body["text"].as_str().unwrap();
    assert!(text.contains("forum topic"), "unexpected reply: {text}");
    assert!(body.get("reply_markup").is_none());
}

#[tokio::test]
async fn rejected_validation_is_reported_into_the_topic() {
    let telegram = MockServer::start().await;
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/miniapp/validate"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "message": "Topic is not active",
            "errors": ["topic archived"]
        })))
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{BOT_TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&telegram)
        .await;

    let bot = test_bot(&telegram.uri(), &backend.uri());
    bot.handle_update(add_command_update(Some(42))).await.unwrap();

    let requests = telegram.received_requests().await.unwrap();
    let body = sent_message_body(&requests[0]);
    let text = body["text"].as_str().unwrap();
    assert!(text.contains("Topic is not active"));
    assert!(text.contains("topic archived"));
    assert_eq!(body["message_thread_id"], 42);
}

#[tokio::test]
async fn non_command_messages_are_ignored() {
    let telegram = MockServer::start().await;
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{BOT_TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&telegram)
        .await;

    let bot = test_bot(&telegram.uri(), &backend.uri());
    let update: Update = serde_json::from_value(serde_json::json!({
        "update_id": 2,
        "message": {
            "chat": {"id": -100123},
            "from": {"id": 777},
            "text": "just chatting"
        }
    }))
    .unwrap();

    bot.handle_update(update).await.unwrap();
}
