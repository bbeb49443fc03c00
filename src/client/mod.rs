//! Typed client for the relay's HTTP API.
//!
//! - [`consumer`]: SSE stream decoding via `eventsource-stream`
//! - [`prompts`]: task prompt builders (analyze, generate, debug, learn)

pub mod consumer;
pub mod prompts;

use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::upstream::ChatMessage;

pub use consumer::{consume_sse, fragment_from_data};

/// `num_predict` used by [`RelayClient::chat`] unless the caller overrides it.
pub const DEFAULT_TOOL_NUM_PREDICT: u64 = 1024;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The response body failed mid-stream.
    #[error("Stream read failed: {0}")]
    Stream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a Map<String, Value>>,
}

/// Client for a running relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    /// `base_url` is the relay origin, e.g. `http://localhost:3001`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    /// Streaming chat. `on_fragment` sees every non-empty fragment as it
    /// arrives; the assembled reply is returned once the stream closes.
    pub async fn chat_stream<F>(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: Option<&Map<String, Value>>,
        on_fragment: F,
    ) -> Result<String, ClientError>
    where
        F: FnMut(&str),
    {
        let body = ChatBody {
            messages,
            model,
            stream: true,
            options: options.filter(|o| !o.is_empty()),
        };
        debug!(model, messages = messages.len(), "Streaming chat");

        let response = self.http.post(self.url("chat")).json(&body).send().await?;
        let response = check_status(response).await?;
        consume_sse(response.bytes_stream(), on_fragment).await
    }

    /// Non-streaming chat. Returns `message.content` of the reply, or an
    /// empty string when the reply has none.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: Option<&Map<String, Value>>,
    ) -> Result<String, ClientError> {
        let mut merged = Map::new();
        merged.insert("num_predict".into(), DEFAULT_TOOL_NUM_PREDICT.into());
        if let Some(options) = options {
            merged.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let body = ChatBody {
            messages,
            model,
            stream: false,
            options: Some(&merged),
        };
        debug!(model, messages = messages.len(), "Chat");

        let response = self.http.post(self.url("chat")).json(&body).send().await?;
        let data: Value = check_status(response).await?.json().await?;
        Ok(data
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Models known to the upstream server (`models` of `/api/tags`).
    pub async fn list_models(&self) -> Result<Vec<Value>, ClientError> {
        let response = self.http.get(self.url("models")).send().await?;
        let data: Value = check_status(response).await?.json().await?;
        Ok(data
            .get("models")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let response = self.http.get(self.url("health")).send().await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turn a non-success response into [`ClientError::Status`], preferring the
/// body's `error` field over the status reason.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = status.canonical_reason().unwrap_or("Request failed").to_string();
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(reason);

    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
