//! Validation and sanitization of incoming chat requests.

use serde_json::{Map, Value};

use crate::config::UpstreamConfig;
use crate::error::RelayError;
use crate::upstream::{ChatMessage, ChatRequest, Role};

/// Longest accepted string, in characters.
pub const MAX_INPUT_CHARS: usize = 50_000;

/// Validation message for a body without a usable `messages` array.
pub const MESSAGES_REQUIRED: &str = "messages array is required";

/// Truncate to [`MAX_INPUT_CHARS`] and strip NUL characters.
/// Non-string values sanitize to the empty string.
pub fn sanitize_input(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        Some(text) => text
            .chars()
            .take(MAX_INPUT_CHARS)
            .filter(|c| *c != '\0')
            .collect(),
        None => String::new(),
    }
}

/// Build the upstream request from a client body of the form
/// `{ messages, model?, stream?, options? }`.
pub fn prepare_chat_request(
    body: &Value,
    config: &UpstreamConfig,
) -> Result<ChatRequest, RelayError> {
    let messages = match body.get("messages").and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(RelayError::Validation(MESSAGES_REQUIRED.into())),
    };

    let messages = messages
        .iter()
        .map(|m| ChatMessage {
            role: Role::coerce(m.get("role").and_then(Value::as_str)),
            content: sanitize_input(m.get("content")),
        })
        .collect();

    let mut model = sanitize_input(body.get("model"));
    if model.is_empty() {
        model = config.default_model.clone();
    }

    let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(true);

    let mut options = Map::new();
    options.insert("num_predict".into(), config.num_predict.into());
    if let Some(client_options) = body.get("options").and_then(Value::as_object) {
        for (key, value) in client_options {
            options.insert(key.clone(), value.clone());
        }
    }

    Ok(ChatRequest {
        model,
        messages,
        stream,
        options,
    })
}
