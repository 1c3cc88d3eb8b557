//! Inbound Slack Events API route handler.
//!
//! Slack pushes workspace lifecycle notifications here. Deliveries are
//! authenticated with the app's signing secret before anything is parsed;
//! the raw body is needed for that, so this handler takes `String` instead
//! of a JSON extractor.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use courier_core::{SlackUserId, TeamId};

use crate::error::{AppError, Result};
use crate::slack::verify_signature;
use crate::state::AppState;

/// Top-level Events API delivery.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventEnvelope {
    /// Endpoint ownership handshake sent when the URL is configured.
    UrlVerification { challenge: String },
    /// A subscribed workspace event.
    EventCallback { team_id: TeamId, event: WorkspaceEvent },
    #[serde(other)]
    Other,
}

/// The inner event of an `event_callback` delivery.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorkspaceEvent {
    /// The workspace changed its display name.
    TeamRename { name: String },
    /// OAuth tokens were revoked (app removed, or user deauthorized).
    TokensRevoked { tokens: RevokedTokens },
    #[serde(other)]
    Other,
}

/// Token IDs carried by a `tokens_revoked` event, grouped by kind.
#[derive(Debug, Deserialize)]
struct RevokedTokens {
    #[serde(default)]
    oauth: Vec<SlackUserId>,
}

/// Receive a Slack event delivery.
///
/// # Route
///
/// `POST /slack/event`
///
/// Verified deliveries are always acknowledged with a 200 even when the
/// event matches no stored workspace - Slack is the source of truth for
/// these lifecycle changes, and retrying them would not help.
#[instrument(skip(state, headers, body))]
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".to_owned()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".to_owned()))?;

    verify_signature(
        &state.config().slack.signing_secret,
        timestamp,
        &body,
        signature,
    )
    .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let envelope: EventEnvelope = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid event payload: {e}")))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            debug!("answering url_verification handshake");
            Ok(Json(serde_json::json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback { team_id, event } => {
            handle_workspace_event(&state, &team_id, event).await?;
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Other => {
            debug!("ignoring unrecognized event delivery");
            Ok(StatusCode::OK.into_response())
        }
    }
}

async fn handle_workspace_event(
    state: &AppState,
    team_id: &TeamId,
    event: WorkspaceEvent,
) -> Result<()> {
    match event {
        WorkspaceEvent::TeamRename { name } => {
            info!(team_id = %team_id, name = %name, "workspace renamed");
            state.store().rename_team(team_id, &name).await?;
        }
        WorkspaceEvent::TokensRevoked { tokens } => {
            // The first revoked user-level token identifies the installing
            // user whose grant is gone.
            if let Some(user_id) = tokens.oauth.first() {
                info!(team_id = %team_id, user_id = %user_id, "tokens revoked, deleting credentials");
                state.store().delete(team_id, user_id).await?;
            } else {
                debug!(team_id = %team_id, "tokens_revoked without user tokens, ignoring");
            }
        }
        WorkspaceEvent::Other => {
            debug!(team_id = %team_id, "ignoring unsubscribed event type");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_verification_envelope() {
        let json = r#"{
            "token": "Jhj5dZrVaK7ZwHHjRyZWjbDl",
            "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P",
            "type": "url_verification"
        }"#;

        let envelope: EventEnvelope = serde_json::from_str(json).expect("deserializes");
        assert!(matches!(envelope, EventEnvelope::UrlVerification { .. }));
    }

    #[test]
    fn test_team_rename_envelope() {
        let json = r#"{
            "token": "XXYYZZ",
            "team_id": "T1",
            "type": "event_callback",
            "event": {"type": "team_rename", "name": "New Name", "event_ts": "1.0"}
        }"#;

        let envelope: EventEnvelope = serde_json::from_str(json).expect("deserializes");
        match envelope {
            EventEnvelope::EventCallback { team_id, event } => {
                assert_eq!(team_id.as_str(), "T1");
                match event {
                    WorkspaceEvent::TeamRename { name } => assert_eq!(name, "New Name"),
                    other => panic!("expected team_rename, got {other:?}"),
                }
            }
            other => panic!("expected event_callback, got {other:?}"),
        }
    }

    #[test]
    fn test_tokens_revoked_envelope() {
        let json = r#"{
            "team_id": "T1",
            "type": "event_callback",
            "event": {
                "type": "tokens_revoked",
                "tokens": {"oauth": ["U123"], "bot": ["B123"]}
            }
        }"#;

        let envelope: EventEnvelope = serde_json::from_str(json).expect("deserializes");
        match envelope {
            EventEnvelope::EventCallback { event, .. } => match event {
                WorkspaceEvent::TokensRevoked { tokens } => {
                    assert_eq!(tokens.oauth.first().map(SlackUserId::as_str), Some("U123"));
                }
                other => panic!("expected tokens_revoked, got {other:?}"),
            },
            other => panic!("expected event_callback, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_type_is_tolerated() {
        let json = r#"{
            "team_id": "T1",
            "type": "event_callback",
            "event": {"type": "emoji_changed", "subtype": "add"}
        }"#;

        let envelope: EventEnvelope = serde_json::from_str(json).expect("deserializes");
        match envelope {
            EventEnvelope::EventCallback { event, .. } => {
                assert!(matches!(event, WorkspaceEvent::Other));
            }
            other => panic!("expected event_callback, got {other:?}"),
        }
    }
}
