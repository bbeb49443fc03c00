//! Upstream NDJSON → client SSE relay.
//!
//! Reads the upstream body as it arrives, splits it into lines and emits one
//! [`RelayedEvent`] per content-bearing line, in upstream order. Nothing is
//! buffered beyond the current partial line.
//!
//! The returned stream owns the upstream body. When the client disconnects,
//! axum drops the stream, which drops the body and releases the upstream
//! connection; no further reads or writes happen for that request.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use crate::codec::{classify_line, LineBuffer, LineKind, RelayedEvent};

/// Map one upstream line to the event it produces, if any.
///
/// Malformed lines are dropped silently; they are only visible at `trace`.
pub fn line_to_event(line: &str) -> Option<RelayedEvent> {
    match classify_line(line) {
        LineKind::Chunk(chunk) => Some(RelayedEvent::new(chunk.into_content())),
        LineKind::Malformed => {
            trace!(line = %line, "Skipping unparsable upstream line");
            None
        }
        LineKind::Blank | LineKind::Done | LineKind::NoContent => None,
    }
}

/// Tracks how a relay ended, for the log line emitted when it is dropped.
struct RelayGuard {
    request_id: String,
    events: usize,
    finished: bool,
}

impl RelayGuard {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            events: 0,
            finished: false,
        }
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if self.finished {
            debug!(
                request_id = %self.request_id,
                events = self.events,
                "Relay finished"
            );
        } else {
            debug!(
                request_id = %self.request_id,
                events = self.events,
                "Relay dropped before upstream finished, connection released"
            );
        }
    }
}

/// Translate an upstream byte stream into relayed events.
///
/// With `idle_timeout` set, a gap longer than the window between reads ends
/// the relay without flushing the partial line.
pub fn relay_events<S, E>(
    body: S,
    idle_timeout: Option<Duration>,
    request_id: String,
) -> impl Stream<Item = RelayedEvent>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut guard = RelayGuard::new(request_id);
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::new();

        loop {
            let next = match idle_timeout {
                Some(window) => match tokio::time::timeout(window, body.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            request_id = %guard.request_id,
                            idle_ms = window.as_millis() as u64,
                            "Upstream stream idle past timeout, closing relay"
                        );
                        return;
                    }
                },
                None => body.next().await,
            };

            match next {
                Some(Ok(bytes)) => {
                    for line in lines.push(&bytes) {
                        if let Some(event) = line_to_event(&line) {
                            guard.events += 1;
                            yield event;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(request_id = %guard.request_id, error = %e, "Upstream stream failed");
                    return;
                }
                None => break,
            }
        }

        if let Some(rest) = lines.finish() {
            if let Some(event) = line_to_event(&rest) {
                guard.events += 1;
                yield event;
            }
        }
        guard.finished = true;
    }
}

/// [`relay_events`] framed as SSE for axum.
pub fn relay_to_sse<S, E>(
    body: S,
    idle_timeout: Option<Duration>,
    request_id: String,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    relay_events(body, idle_timeout, request_id)
        .map(|event| Ok(Event::default().data(event.to_json())))
}
