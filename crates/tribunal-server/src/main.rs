//! Tribunal server binary.
//!
//! Starts an axum HTTP server with structured logging, the vote engine and
//! platform clients, and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tribunal_server::{
    app, background,
    config::{self, Config},
    outbound::{LogOnlyPlatform, MessagingSink, ModerationAction, PlatformClient},
    AppState,
};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("TRIBUNAL_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn platform(config: &Config) -> (Arc<dyn MessagingSink>, Arc<dyn ModerationAction>) {
    if config.platform.is_enabled() {
        let client = Arc::new(PlatformClient::new(&config.platform));
        tracing::info!(base_url = %config.platform.base_url, "using platform webhooks");
        (client.clone(), client)
    } else {
        tracing::warn!("platform.base_url not set; messages and timeouts are only logged");
        let log_only = Arc::new(LogOnlyPlatform);
        (log_only.clone(), log_only)
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    tracing::info!(
        percentage = config.vote.percentage,
        duration_seconds = config.vote.duration_seconds,
        timeout_seconds = config.vote.timeout_seconds,
        resolve_on_quorum = config.vote.resolve_on_quorum,
        "vote policy loaded"
    );

    let (sink, moderation) = platform(&config);
    let state = AppState::new(config.vote.clone(), sink.clone(), moderation);

    if let Some(room) = config.platform.announce_room.clone() {
        tokio::spawn(background::announce_startup(sink, room));
    }

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting tribunal server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("tribunal server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
