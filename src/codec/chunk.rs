//! Upstream NDJSON line classification.
//!
//! Ollama speaks two dialects: `/api/chat` puts text under `message.content`,
//! `/api/generate` puts it under `response`. Each line is resolved to one
//! [`UpstreamChunk`] variant so the relay loop has a single code path.

use serde_json::Value;

/// Prefix tolerated on upstream lines that are already SSE-framed.
pub const DATA_PREFIX: &str = "data: ";

/// Sentinel line some upstreams send at the end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Text carried by one upstream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamChunk {
    /// `{"message": {"content": ...}}`
    Message(String),
    /// `{"response": ...}`
    Response(String),
}

impl UpstreamChunk {
    /// Resolve a parsed JSON value. `message.content` wins over `response`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(content) = value
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
        {
            return Some(Self::Message(content.to_owned()));
        }

        value
            .get("response")
            .and_then(Value::as_str)
            .map(|response| Self::Response(response.to_owned()))
    }

    pub fn into_content(self) -> String {
        match self {
            Self::Message(text) | Self::Response(text) => text,
        }
    }
}

/// What a single upstream line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace only.
    Blank,
    /// The `[DONE]` sentinel.
    Done,
    /// Not valid JSON (truncated or garbage).
    Malformed,
    /// Valid JSON without a content field, e.g. the final stats object.
    NoContent,
    /// A content fragment, possibly empty.
    Chunk(UpstreamChunk),
}

/// Classify one line of upstream output.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    let raw = trimmed.strip_prefix(DATA_PREFIX).unwrap_or(trimmed);
    if raw == DONE_SENTINEL {
        return LineKind::Done;
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => match UpstreamChunk::from_value(&value) {
            Some(chunk) => LineKind::Chunk(chunk),
            None => LineKind::NoContent,
        },
        Err(_) => LineKind::Malformed,
    }
}
