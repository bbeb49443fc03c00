//! Wire codec shared by the relay and the client consumer.
//!
//! - [`utf8`]: incremental UTF-8 decoding across read boundaries
//! - [`lines`]: newline buffering on top of the decoder
//! - [`chunk`]: upstream NDJSON line classification
//! - [`frame`]: the SSE event payload the relay emits and the client parses
//!
//! Both halves of the stream go through this module so the emitted and
//! parsed framings cannot drift apart.

pub mod chunk;
pub mod frame;
pub mod lines;
pub mod utf8;

pub use chunk::{classify_line, LineKind, UpstreamChunk};
pub use frame::RelayedEvent;
pub use lines::LineBuffer;
pub use utf8::Utf8Decoder;
