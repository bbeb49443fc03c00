//! codementor-relay server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use codementor_relay::config::{Cli, Config};
use codementor_relay::server::rate_limit::FixedWindowLimiter;
use codementor_relay::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "codementor_relay=debug,tower_http=debug"
    } else {
        "codementor_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("codementor-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration: file, then environment, then CLI.
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    let config = Arc::new(config);

    info!(
        upstream = %config.upstream.base_url,
        default_model = %config.upstream.default_model,
        timeout_ms = config.upstream.timeout_ms,
        timeout_mode = ?config.upstream.timeout_mode,
        num_predict = config.upstream.num_predict,
        "Configuration loaded"
    );
    info!(
        origins = ?config.server.allowed_origins,
        requests_per_minute = config.rate_limit.requests_per_minute,
        "Client policy"
    );

    let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
    let state = Arc::new(AppState::new(config.clone(), limiter));
    let app = build_router(state);

    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
