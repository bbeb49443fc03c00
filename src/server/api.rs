//! Client-facing HTTP API.
//!
//! - POST /api/chat
//! - GET /api/models
//! - GET /api/health
//!
//! Anything else answers 404 with a JSON error body.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::RelayError;
use crate::server::rate_limit::{self, RateLimiter};
use crate::server::request::{prepare_chat_request, MESSAGES_REQUIRED};
use crate::server::streaming::relay_to_sse;
use crate::upstream::UpstreamClient;

/// Application state shared across handlers.
pub struct AppState {
    pub upstream: UpstreamClient,
    pub config: Arc<Config>,
    pub limiter: Arc<dyn RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            upstream: UpstreamClient::new(&config.upstream),
            config,
            limiter,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all API routes and layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let cors = cors_layer(&state.config.server.allowed_origins);
    let limiter = state.limiter.clone();
    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ));

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/models", get(list_models))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(security_headers)
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

// ─── Response Types ────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ollama: String,
    pub uptime_secs: u64,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(body) = payload.map_err(|rejection| match rejection {
        // A body that is not JSON carries no messages array.
        JsonRejection::MissingJsonContentType(_)
        | JsonRejection::JsonSyntaxError(_)
        | JsonRejection::JsonDataError(_) => RelayError::Validation(MESSAGES_REQUIRED.into()),
        other => RelayError::Rejected {
            status: other.status(),
            message: other.body_text(),
        },
    })?;

    let request = prepare_chat_request(&body, &state.config.upstream)?;
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = request_id,
        model = request.model,
        messages = request.messages.len(),
        stream = request.stream,
        "Chat request"
    );

    if !request.stream {
        let data = state.upstream.chat_json(&request).await?;
        return Ok(Json(data).into_response());
    }

    let response = state.upstream.chat(&request).await?;
    let events = relay_to_sse(
        response.bytes_stream(),
        state.upstream.idle_timeout(),
        request_id,
    );

    Ok((
        [(header::CONNECTION, HeaderValue::from_static("keep-alive"))],
        Sse::new(events),
    )
        .into_response())
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<Value>, RelayError> {
    let models = state.upstream.list_models().await?;
    Ok(Json(models))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ollama: state.upstream.base_url().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
