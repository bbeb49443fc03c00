//! Relay error taxonomy.
//!
//! Every failure that ends a request maps to a single JSON `{"error": ...}`
//! response. None of these are ever sent as SSE events.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Malformed or empty request; no upstream call was made.
    #[error("{0}")]
    Validation(String),

    /// The request body could not be read, e.g. it exceeds the size limit.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// The upstream did not answer within the timeout window.
    #[error("Ollama took too long to respond. Try a smaller model or shorter prompt.")]
    Timeout,

    /// Connection refused, DNS failure or another transport error.
    #[error("Cannot reach Ollama. Is it running at {base}?")]
    Unreachable {
        base: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a body that is not the expected JSON.
    #[error("Cannot reach Ollama. Is it running at {base}?")]
    InvalidUpstreamBody {
        base: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status; forwarded verbatim.
    #[error("{body}")]
    UpstreamStatus { status: StatusCode, body: String },

    /// The caller exceeded its request budget.
    #[error("Too many requests. Please slow down.")]
    RateLimited,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Unreachable { .. } | Self::InvalidUpstreamBody { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamStatus { status, .. } => *status,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
