//! Validation backend client.
//!
//! Rejection is an expected outcome of a validation call, so it is a value
//! (`ValidateOutcome::Rejected`), not an error. `Err` is reserved for
//! transport-level problems: backend unreachable, 5xx, undecodable body.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::miniapp::{BankRef, StartPayload};

#[derive(Debug, Clone, Serialize)]
pub struct ValidateRequest {
    pub chat_id: String,
    pub thread_id: i64,
    pub user_id: String,
}

/// Topic context the backend hands back for an approved request.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicContext {
    pub chat_id: i64,
    pub thread_id: i64,
    #[serde(default)]
    pub chat_title: Option<String>,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub bank: Option<BankRef>,
}

impl TopicContext {
    /// Falls back to the chat title observed in the triggering update when
    /// the backend does not carry one.
    pub fn into_start_payload(self, observed_title: Option<&str>) -> StartPayload {
        StartPayload {
            chat_id: self.chat_id,
            thread_id: self.thread_id,
            chat_title: self
                .chat_title
                .or_else(|| observed_title.map(str::to_owned))
                .unwrap_or_default(),
            topic_name: self.topic_name,
            bank: self.bank,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValidateOutcome {
    Approved(TopicContext),
    Rejected { message: String, details: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct ApprovedBody {
    data: TopicContext,
}

#[derive(Debug, Default, Deserialize)]
struct RejectedBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn validate_topic(&self, request: &ValidateRequest) -> Result<ValidateOutcome> {
        let url = format!("{}/miniapp/validate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("backend validate request")?;

        let status = resp.status();
        if status.is_success() {
            let body: ApprovedBody = resp.json().await.context("backend validate response")?;
            return Ok(ValidateOutcome::Approved(body.data));
        }

        if status.is_client_error() {
            let body: RejectedBody = resp.json().await.unwrap_or_default();
            return Ok(ValidateOutcome::Rejected {
                message: body
                    .message
                    .unwrap_or_else(|| "Request rejected".to_string()),
                details: body.errors,
            });
        }

        Err(BackendError::Request(format!("{url} returned {status}")).into())
    }
}
