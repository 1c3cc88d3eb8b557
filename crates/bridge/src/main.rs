//! Courier Bridge - Slack workspace bridge service.
//!
//! This binary serves the bridge HTTP API.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Slack Web API for message posting, history, and the OAuth install flow
//! - `PostgreSQL` for per-workspace credentials
//!
//! Startup order matters: configuration is validated first (the process
//! refuses to start with missing variables), then the database pool is
//! created and migrations run, then the server binds.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use courier_bridge::config::BridgeConfig;
use courier_bridge::db::{self, PgCredentialStore};
use courier_bridge::slack::{ApiSenderResolver, SlackApi, SlackClient};
use courier_bridge::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = BridgeConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "courier_bridge=info,tower_http=debug".into());

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Initialize database connection pool
    let pool = db::create_pool(&config.database.url())
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // Create the credentials table if this is a fresh database
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // Build application state
    let slack: Arc<dyn SlackApi> = Arc::new(SlackClient::new(&config.slack));
    let resolver = Arc::new(ApiSenderResolver::new(slack.clone()));
    let store = Arc::new(PgCredentialStore::new(pool));
    let state = AppState::new(config.clone(), store, slack, resolver);

    // Build router
    let app = courier_bridge::app(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("bridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
