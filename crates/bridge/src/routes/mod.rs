//! HTTP route handlers for the bridge.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health            - Liveness check (wired in lib.rs)
//!
//! # Bridge API
//! POST /message/send      - Send a message to a channel
//! GET  /messages          - Fetch channel history with threads
//! POST /message/echo      - Slash-command echo
//!
//! # Slack-facing
//! GET,POST /auth          - OAuth install callback
//! POST /slack/event       - Signature-verified event deliveries
//! ```

pub mod auth;
pub mod echo;
pub mod events;
pub mod messages;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create all routes for the bridge.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/message/send", post(messages::send_message))
        .route("/messages", get(messages::get_messages))
        .route("/message/echo", post(echo::echo_command))
        .route("/auth", get(auth::authorize).post(auth::authorize))
        .route("/slack/event", post(events::receive_event))
}
