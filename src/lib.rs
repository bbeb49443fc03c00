//! codementor-relay: streaming HTTP relay in front of an Ollama server.
//!
//! The relay forwards chat and model-list requests, re-framing the upstream
//! NDJSON stream as Server-Sent Events. The client half decodes that stream
//! back into text fragments.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod upstream;
