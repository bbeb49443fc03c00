//! The event payload relayed to clients.
//!
//! The relay emits `data: {"message":{"content":"..."}}\n\n` for every
//! fragment; the client consumer deserializes the `data` field back into [`RelayedEvent`].

use serde::{Deserialize, Serialize};

use crate::codec::chunk::DATA_PREFIX;

/// One relayed fragment, as serialized into an SSE `data:` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedEvent {
    pub message: EventMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub content: String,
}

impl RelayedEvent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message: EventMessage {
                content: content.into(),
            },
        }
    }

    /// JSON body of the `data:` field.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Complete SSE frame, including the blank-line terminator.
    pub fn to_frame(&self) -> String {
        format!("{DATA_PREFIX}{}\n\n", self.to_json())
    }
}
