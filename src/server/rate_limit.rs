//! Per-caller request rate limiting.
//!
//! The limiter is the only state shared across requests. Handlers see it
//! through the narrow [`RateLimiter`] trait so deployments can swap in a
//! distributed implementation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::config::RateLimitConfig;
use crate::error::RelayError;

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny,
}

pub trait RateLimiter: Send + Sync {
    /// Record one request from `caller` and decide whether it may proceed.
    fn check(&self, caller: &str) -> RateDecision;
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by caller.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

/// Expired windows are pruned once the map grows past this many callers.
const PRUNE_THRESHOLD: usize = 10_000;

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.requests_per_minute,
            Duration::from_secs(config.window_secs),
        )
    }

    fn check_at(&self, caller: &str, now: Instant) -> RateDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("Rate limiter mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(caller.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            return RateDecision::Deny;
        }
        entry.count += 1;
        RateDecision::Allow
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, caller: &str) -> RateDecision {
        self.check_at(caller, Instant::now())
    }
}

/// Middleware applying a [`RateLimiter`] keyed by peer IP.
pub async fn enforce(
    State(limiter): State<Arc<dyn RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let caller = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&caller) {
        RateDecision::Allow => next.run(request).await,
        RateDecision::Deny => {
            debug!(caller = %caller, path = %request.uri().path(), "Rate limit exceeded");
            RelayError::RateLimited.into_response()
        }
    }
}
