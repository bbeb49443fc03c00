//! Client-side SSE consumer.
//!
//! Mirror image of [`crate::server::streaming`]: the relay's
//! `data: {"message":{"content":...}}` frames are parsed by
//! `eventsource-stream` and each `data` field is deserialized back into
//! [`RelayedEvent`].

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use tracing::trace;

use crate::client::ClientError;
use crate::codec::chunk::DONE_SENTINEL;
use crate::codec::{RelayedEvent, Utf8Decoder};

/// Fragment carried by one SSE `data` field.
///
/// `None` for the `[DONE]` sentinel, unparsable payloads and empty content.
pub fn fragment_from_data(data: &str) -> Option<String> {
    if data == DONE_SENTINEL {
        return None;
    }
    match serde_json::from_str::<RelayedEvent>(data) {
        Ok(event) => Some(event.message.content).filter(|content| !content.is_empty()),
        Err(e) => {
            trace!(error = %e, "Skipping unparsable SSE data");
            None
        }
    }
}

/// Drain an SSE body, calling `on_fragment` for every fragment in arrival
/// order. Returns the concatenation of all fragments.
pub async fn consume_sse<S, E, F>(body: S, mut on_fragment: F) -> Result<String, ClientError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    F: FnMut(&str),
{
    // Multi-byte characters split across reads are reassembled before parsing.
    let mut utf8 = Utf8Decoder::new();
    let text = body.map(move |chunk| chunk.map(|bytes| utf8.decode(&bytes)));
    let mut events = std::pin::pin!(text.eventsource());
    let mut full = String::new();

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| ClientError::Stream(e.to_string().into()))?;
        if let Some(fragment) = fragment_from_data(&event.data) {
            full.push_str(&fragment);
            on_fragment(&fragment);
        }
    }

    Ok(full)
}
