//! Courier Bridge library.
//!
//! This crate provides the bridge functionality as a library, allowing the
//! full router to be driven in tests with fake Slack and store
//! implementations.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Slack Web API for messaging and the OAuth install flow
//! - `PostgreSQL` for per-workspace credentials (the only persisted state)
//!
//! External callers talk to the bridge API (`/message/send`, `/messages`,
//! `/message/echo`); Slack talks to `/auth` and `/slack/event`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod slack;
pub mod state;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the complete application router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
