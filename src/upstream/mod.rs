//! Upstream model server (Ollama) access.
//!
//! - [`types`]: chat message and request types sent upstream
//! - [`client`]: HTTP client with timeout policy and error classification

pub mod client;
pub mod types;

pub use client::UpstreamClient;
pub use types::{ChatMessage, ChatRequest, Role};
