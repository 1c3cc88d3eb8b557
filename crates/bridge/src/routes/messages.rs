//! Message send and history route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use courier_core::{ChannelMessage, CredentialRecord, ThreadReply};

use crate::error::{AppError, Result};
use crate::slack::{HistoryMessage, SlackError};
use crate::state::AppState;

/// Request body for `POST /message/send`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Workspace display name.
    pub team: String,
    /// Target channel identifier, passed through to Slack verbatim.
    pub channel: String,
    pub text: String,
}

/// Send a message to a channel as the workspace's bot.
///
/// # Route
///
/// `POST /message/send`
///
/// Returns 200 with an empty body on success. Unknown workspace or channel
/// and missing bot membership come back as 400 `{type, text}`; any other
/// Slack failure surfaces as a 502 platform fault rather than being silently
/// swallowed.
#[instrument(skip(state, request), fields(team = %request.team, channel = %request.channel))]
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<StatusCode> {
    let record = require_team(&state, &request.team).await?;

    match state
        .slack()
        .post_message(&record.bot_access_token, &request.channel, &request.text)
        .await
    {
        Ok(()) => Ok(StatusCode::OK),
        Err(SlackError::Api(code)) => Err(match code.as_str() {
            "channel_not_found" => AppError::ChannelNotFound,
            "not_in_channel" => AppError::NotInChannel,
            _ => AppError::Platform(SlackError::Api(code)),
        }),
        Err(other) => Err(AppError::Platform(other)),
    }
}

/// Query parameters for `GET /messages`.
#[derive(Debug, Deserialize)]
pub struct GetMessagesQuery {
    /// Workspace display name.
    pub team: String,
    /// Channel display name (not ID).
    pub channel: String,
    /// Oldest timestamp bound, platform-native format.
    pub from: String,
    /// Latest timestamp bound, platform-native format.
    pub to: String,
}

/// Fetch a channel's message history, threads included.
///
/// # Route
///
/// `GET /messages?team=..&channel=..&from=..&to=..`
///
/// The channel is addressed by display name, so the handler lists the
/// channels visible to the bot and matches on exact name. Each history entry
/// is projected to `{text, sender, time, thread}` with senders resolved to
/// display names - one `users.info` call per message and per thread reply.
#[instrument(skip(state, query), fields(team = %query.team, channel = %query.channel))]
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<GetMessagesQuery>,
) -> Result<Json<Vec<ChannelMessage>>> {
    let record = require_team(&state, &query.team).await?;
    let token = &record.bot_access_token;

    let channels = state
        .slack()
        .list_channels(token)
        .await
        .map_err(channel_access_error)?;

    let channel = channels
        .into_iter()
        .find(|c| c.name == query.channel)
        .ok_or(AppError::ChannelNotFound)?;

    let history = state
        .slack()
        .history(token, &channel.id, &query.from, &query.to)
        .await
        .map_err(channel_access_error)?;

    let mut messages = Vec::with_capacity(history.len());
    for message in history {
        let thread = match &message.thread_ts {
            Some(thread_ts) => {
                let replies = state
                    .slack()
                    .thread_replies(token, &channel.id, thread_ts)
                    .await?;
                // The first entry is the thread parent, already represented
                // at the top level.
                let mut thread = Vec::new();
                for reply in replies.into_iter().skip(1) {
                    thread.push(ThreadReply {
                        sender: resolve_sender(&state, token, &reply).await?,
                        text: reply.text,
                        time: reply.ts,
                    });
                }
                thread
            }
            None => Vec::new(),
        };

        messages.push(ChannelMessage {
            sender: resolve_sender(&state, token, &message).await?,
            text: message.text,
            time: message.ts,
            thread,
        });
    }

    Ok(Json(messages))
}

/// Look up the credential record for a workspace display name.
async fn require_team(state: &AppState, team_name: &str) -> Result<CredentialRecord> {
    state
        .store()
        .find_by_team_name(team_name)
        .await?
        .ok_or(AppError::TeamNotFound)
}

/// Map a Slack failure while listing channels or fetching history.
///
/// A structured API error here means the bot cannot see into the channel
/// (most commonly `not_in_channel`); transport and parse failures stay
/// platform faults.
fn channel_access_error(error: SlackError) -> AppError {
    match error {
        SlackError::Api(_) => AppError::NotInChannel,
        other => AppError::Platform(other),
    }
}

async fn resolve_sender(
    state: &AppState,
    token: &str,
    message: &HistoryMessage,
) -> Result<String> {
    let name = state.resolver().resolve(token, &message.user).await?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_access_error_mapping() {
        let api = channel_access_error(SlackError::Api("not_in_channel".to_owned()));
        assert!(matches!(api, AppError::NotInChannel));

        let transport = channel_access_error(SlackError::Request("connection refused".to_owned()));
        assert!(matches!(transport, AppError::Platform(_)));
    }

    #[test]
    fn test_send_request_deserializes() {
        let request: SendMessageRequest =
            serde_json::from_str(r#"{"team":"Acme","channel":"C1","text":"hi"}"#)
                .expect("deserializes");
        assert_eq!(request.team, "Acme");
        assert_eq!(request.channel, "C1");
        assert_eq!(request.text, "hi");
    }
}
