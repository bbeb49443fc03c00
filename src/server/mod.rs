//! HTTP relay server.
//!
//! - [`api`]: router, layers and route handlers
//! - [`streaming`]: upstream NDJSON → SSE relay
//! - [`request`]: validation and sanitization of chat requests
//! - [`rate_limit`]: per-caller request limiting

pub mod api;
pub mod rate_limit;
pub mod request;
pub mod streaming;

pub use api::{build_router, AppState};
