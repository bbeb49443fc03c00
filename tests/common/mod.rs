//! Shared harness: mock Ollama upstreams and an in-process relay.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use codementor_relay::config::{Config, TimeoutMode};
use codementor_relay::server::rate_limit::FixedWindowLimiter;
use codementor_relay::server::{build_router, AppState};

/// Serve `router` on an ephemeral port, returning its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

pub fn relay_config(upstream: &str) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = upstream.to_string();
    config.upstream.timeout_ms = 2_000;
    config
}

/// Start a relay with `config`, returning its base URL.
pub async fn spawn_relay(config: Config) -> String {
    let config = Arc::new(config);
    let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
    let state = Arc::new(AppState::new(config, limiter));
    serve(build_router(state)).await
}

pub async fn spawn_relay_for(upstream: &str) -> String {
    spawn_relay(relay_config(upstream)).await
}

pub fn idle_config(upstream: &str, timeout_ms: u64) -> Config {
    let mut config = relay_config(upstream);
    config.upstream.timeout_ms = timeout_ms;
    config.upstream.timeout_mode = TimeoutMode::Idle;
    config
}

// ─── Scripted upstream ─────────────────────────────────────────────────────

/// What the scripted upstream does on `POST /api/chat`.
#[derive(Clone)]
pub enum Script {
    /// Stream these raw body chunks, then close.
    Stream(Vec<&'static str>),
    /// Stream these chunks, then keep the connection open without sending more.
    StreamThenStall(Vec<&'static str>),
    /// Answer with this status and plain-text body.
    Fail(StatusCode, &'static str),
}

#[derive(Clone)]
pub struct Upstream {
    script: Script,
    /// Every chat body received, in order.
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl Upstream {
    pub fn last_request(&self) -> Value {
        self.received.lock().unwrap().last().cloned().expect("no request received")
    }

    pub fn request_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

fn body_of(chunks: Vec<&'static str>) -> impl futures::Stream<Item = Result<Bytes, Infallible>> {
    stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
}

async fn scripted_chat(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Response {
    let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
    upstream.received.lock().unwrap().push(body);

    match upstream.script {
        Script::Fail(status, text) => (status, text).into_response(),
        Script::Stream(chunks) if !streaming => {
            // Non-streaming: the whole reply as one object.
            let content: String = chunks
                .iter()
                .flat_map(|c| c.lines())
                .filter_map(|line| serde_json::from_str::<Value>(line).ok())
                .filter_map(|v| v["message"]["content"].as_str().map(str::to_owned))
                .collect();
            Json(json!({
                "model": "llama3.2",
                "message": {"role": "assistant", "content": content},
                "done": true
            }))
            .into_response()
        }
        Script::Stream(chunks) => ndjson(Body::from_stream(body_of(chunks))),
        Script::StreamThenStall(chunks) => {
            let body = body_of(chunks).chain(stream::pending());
            ndjson(Body::from_stream(body))
        }
    }
}

fn ndjson(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
}

async fn tags() -> Json<Value> {
    Json(json!({
        "models": [
            {"name": "llama3.2:latest", "size": 2019393189u64},
            {"name": "qwen2.5-coder:7b", "size": 4683087332u64}
        ]
    }))
}

/// Start a scripted upstream, returning its base URL and handle.
pub async fn spawn_upstream(script: Script) -> (String, Upstream) {
    let upstream = Upstream {
        script,
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let router = Router::new()
        .route("/api/chat", post(scripted_chat))
        .route("/api/tags", get(tags))
        .with_state(upstream.clone());
    (serve(router).await, upstream)
}

// ─── Raw TCP upstreams ─────────────────────────────────────────────────────

/// Accepts one connection, reads the request and never answers.
/// Resolves `true` once the relay closes the connection.
pub async fn silent_upstream() -> (String, oneshot::Receiver<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let closed = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
        })
        .await
        .is_ok();
        let _ = tx.send(closed);
    });

    (format!("http://{addr}"), rx)
}

/// Streams a content line every 25 ms for as long as the peer keeps reading.
/// Resolves `true` once a write fails, i.e. the relay released the connection.
pub async fn dripping_upstream() -> (String, oneshot::Receiver<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;

        let head = "HTTP/1.1 200 OK\r\n\
                    content-type: application/x-ndjson\r\n\
                    transfer-encoding: chunked\r\n\r\n";
        let mut released = socket.write_all(head.as_bytes()).await.is_err();

        let line = "{\"message\":{\"content\":\"tick\"}}\n";
        let chunk = format!("{:x}\r\n{line}\r\n", line.len());
        for _ in 0..400 {
            if released {
                break;
            }
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                released = true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        let _ = tx.send(released);
    });

    (format!("http://{addr}"), rx)
}

/// Two-fragment reply: "He" + "llo".
pub fn hello_chunks() -> Vec<&'static str> {
    vec![
        "{\"message\":{\"role\":\"assistant\",\"content\":\"He\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"eval_count\":2}\n",
    ]
}
