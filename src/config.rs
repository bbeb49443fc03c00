//! Runtime configuration for codementor-relay.
//!
//! Configuration is loaded from an optional JSON file, then overridden by
//! environment variables (a `.env` file is honoured by the binaries).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "codementor-relay", about = "Streaming relay in front of an Ollama server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address; overrides the config file and `PORT`.
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client-facing HTTP server.
    pub server: ServerConfig,

    /// Upstream model server.
    pub upstream: UpstreamConfig,

    /// Per-caller request limits.
    pub rate_limit: RateLimitConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:3001").
    pub listen: String,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,

    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3001".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// How the upstream timeout window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutMode {
    /// From connection start until response headers; the body is unbounded.
    #[default]
    Headers,
    /// Headers as above, then the same window between consecutive body reads.
    Idle,
}

impl std::str::FromStr for TimeoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headers" => Ok(Self::Headers),
            "idle" => Ok(Self::Idle),
            other => Err(format!("unknown timeout mode: {other}")),
        }
    }
}

/// Upstream (Ollama) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the model server, without a trailing slash.
    pub base_url: String,

    /// Model used when the request names none.
    pub default_model: String,

    /// Timeout window in milliseconds.
    pub timeout_ms: u64,

    /// What the timeout window covers.
    pub timeout_mode: TimeoutMode,

    /// Default `num_predict` (max output tokens) sent upstream.
    pub num_predict: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            default_model: "llama3.2".to_string(),
            timeout_ms: 120_000,
            timeout_mode: TimeoutMode::Headers,
            num_predict: 2048,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per caller per window.
    pub requests_per_minute: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Numeric values that fail to parse or are zero are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let positive = |key: &str| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };

        if let Some(port) = positive("PORT").and_then(|p| u16::try_from(p).ok()) {
            self.server.listen = format!("0.0.0.0:{port}");
        }
        if let Some(url) = non_empty("OLLAMA_URL") {
            self.upstream.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty("OLLAMA_MODEL") {
            self.upstream.default_model = model.trim().to_string();
        }
        if let Some(ms) = positive("OLLAMA_CHAT_TIMEOUT_MS") {
            self.upstream.timeout_ms = ms;
        }
        if let Some(mode) = non_empty("OLLAMA_TIMEOUT_MODE") {
            match mode.parse() {
                Ok(mode) => self.upstream.timeout_mode = mode,
                Err(e) => tracing::warn!("Ignoring OLLAMA_TIMEOUT_MODE: {e}"),
            }
        }
        if let Some(n) = positive("OLLAMA_NUM_PREDICT") {
            self.upstream.num_predict = n;
        }
        if let Some(origins) = non_empty("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(limit) = positive("RATE_LIMIT_PER_MINUTE").and_then(|n| u32::try_from(n).ok()) {
            self.rate_limit.requests_per_minute = limit;
        }
    }
}
