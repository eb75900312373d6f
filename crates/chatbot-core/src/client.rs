use hyper::ext::ReasonPhrase;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::state::ChatRequest;

/// Endpoint used when the embedder does not name one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001/chat";

const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// Why a chat request produced no reply.
///
/// The `Display` text is what the widget shows to the user, so keep it short.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Could not connect to the server.")]
    Transport(#[source] reqwest::Error),

    #[error("Server error: {code} {detail}")]
    Status { code: u16, detail: String },

    #[error("Invalid response from server.")]
    Decode(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Post one request and wait for the reply.
    ///
    /// `Ok(None)` means the backend answered 2xx but without a usable
    /// `response` field. No retry and no timeout are applied here.
    pub async fn send(&self, request: &ChatRequest) -> Result<Option<String>, ChatError> {
        debug!(
            endpoint = %self.endpoint,
            history = request.history.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(ChatError::Transport)?;

        let status = response.status();
        let reason = sent_reason(&response);
        let body = response.bytes().await.map_err(ChatError::Transport)?;

        if !status.is_success() {
            return Err(ChatError::Status {
                code: status.as_u16(),
                detail: error_detail(status, reason.as_deref(), &body),
            });
        }

        let reply: Value = serde_json::from_slice(&body).map_err(ChatError::Decode)?;
        Ok(reply_text(&reply))
    }
}

/// Pull the assistant text out of a success body. Empty or non-string
/// `response` values count as missing.
fn reply_text(body: &Value) -> Option<String> {
    match body.get("response") {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Reason phrase from the status line, when the server sent one that
/// differs from the canonical text for its code.
fn sent_reason(response: &reqwest::Response) -> Option<String> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .map(str::to_string)
}

/// Message for a non-2xx reply: the body's `detail` when it is JSON and has
/// one, the status reason when it is JSON without one, a generic message
/// otherwise.
fn error_detail(status: StatusCode, reason: Option<&str>, body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => match value.get("detail").and_then(Value::as_str) {
            Some(detail) if !detail.is_empty() => detail.to_string(),
            _ => reason
                .filter(|reason| !reason.is_empty())
                .or(status.canonical_reason())
                .unwrap_or(UNKNOWN_SERVER_ERROR)
                .to_string(),
        },
        Err(_) => UNKNOWN_SERVER_ERROR.to_string(),
    }
}
