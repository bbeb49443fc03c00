//! HTTP client for the upstream model server.
//!
//! Applies the configured timeout window and classifies failures into
//! [`RelayError`] variants. There is no retry: every error is final for the
//! request that hit it.

use std::future::Future;
use std::time::Duration;

use axum::http::StatusCode;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{TimeoutMode, UpstreamConfig};
use crate::error::RelayError;
use crate::upstream::types::ChatRequest;

/// Client for one upstream base URL. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    timeout_mode: TimeoutMode,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            timeout_mode: config.timeout_mode,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Window to apply between body reads, if any.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.timeout_mode {
            TimeoutMode::Headers => None,
            TimeoutMode::Idle => Some(self.timeout),
        }
    }

    /// `POST /api/chat`. Resolves once response headers arrive with a
    /// success status; the body is left unread for the caller.
    pub async fn chat(&self, request: &ChatRequest) -> Result<Response, RelayError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "Forwarding chat request"
        );

        self.with_deadline(async {
            let response = self
                .http
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            Self::check_status(response, |status| {
                format!("Ollama error: {}", status.as_u16())
            })
            .await
        })
        .await
    }

    /// Non-streaming chat: the upstream JSON body, unchanged.
    pub async fn chat_json(&self, request: &ChatRequest) -> Result<Value, RelayError> {
        let response = self.chat(request).await?;
        let body = async {
            response
                .json::<Value>()
                .await
                .map_err(|source| RelayError::InvalidUpstreamBody {
                    base: self.base_url.clone(),
                    source,
                })
        };
        match self.timeout_mode {
            TimeoutMode::Headers => body.await,
            TimeoutMode::Idle => self.with_deadline(body).await,
        }
    }

    /// `GET /api/tags`: the upstream model list, unchanged.
    pub async fn list_models(&self) -> Result<Value, RelayError> {
        let url = format!("{}/api/tags", self.base_url);
        self.with_deadline(async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let response =
                Self::check_status(response, |_| "Failed to list models".to_string()).await?;
            response
                .json::<Value>()
                .await
                .map_err(|source| RelayError::InvalidUpstreamBody {
                    base: self.base_url.clone(),
                    source,
                })
        })
        .await
    }

    /// Run `fut` under the timeout window. Dropping the future on expiry
    /// aborts the in-flight upstream connection.
    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, RelayError>
    where
        F: Future<Output = Result<T, RelayError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    base = %self.base_url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Upstream timed out, request aborted"
                );
                Err(RelayError::Timeout)
            }
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> RelayError {
        if source.is_timeout() {
            return RelayError::Timeout;
        }
        warn!(base = %self.base_url, error = %source, "Upstream unreachable");
        RelayError::Unreachable {
            base: self.base_url.clone(),
            source,
        }
    }

    /// Pass a success response through; otherwise read the error body and
    /// turn it into [`RelayError::UpstreamStatus`].
    async fn check_status<F>(response: Response, fallback: F) -> Result<Response, RelayError>
    where
        F: FnOnce(StatusCode) -> String,
    {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = if text.is_empty() { fallback(status) } else { text };

        warn!(status = status.as_u16(), body = %body, "Upstream returned an error status");
        Err(RelayError::UpstreamStatus { status, body })
    }
}
