//! Slash-command echo route handler.

use axum::{Form, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::{instrument, warn};

use courier_core::{ChannelId, TeamId};

use crate::error::Result;
use crate::state::AppState;

/// Form fields Slack sends with a slash command invocation. Only the fields
/// the echo command reads are modeled.
#[derive(Debug, Deserialize)]
pub struct EchoCommand {
    pub team_id: TeamId,
    pub channel_id: ChannelId,
    pub user_name: String,
    pub text: String,
    /// Short-lived callback URL for delayed/ephemeral replies.
    pub response_url: String,
}

/// Echo a slash command back into the channel it came from.
///
/// # Route
///
/// `POST /message/echo`
///
/// Posts `"<user_name> said: <text>"` as the bot. This route never surfaces
/// a platform failure over HTTP: whatever goes wrong is reported to the
/// caller-supplied `response_url` as an ephemeral notice, and the command
/// delivery itself is acknowledged with an empty 200 so Slack does not show
/// the user a timeout.
#[instrument(skip(state, command), fields(team_id = %command.team_id, channel_id = %command.channel_id))]
pub async fn echo_command(
    State(state): State<AppState>,
    Form(command): Form<EchoCommand>,
) -> Result<StatusCode> {
    let record = state.store().find_by_team_id(&command.team_id).await?;

    let Some(record) = record else {
        warn!(team_id = %command.team_id, "echo command from a workspace with no stored credentials");
        notify(&state, &command.response_url, "This workspace is not installed").await;
        return Ok(StatusCode::OK);
    };

    let text = format!("{} said: {}", command.user_name, command.text);
    if let Err(error) = state
        .slack()
        .post_message(&record.bot_access_token, command.channel_id.as_str(), &text)
        .await
    {
        warn!(error = %error, "echo post failed, notifying response_url");
        notify(
            &state,
            &command.response_url,
            "The bot *is not* a member of the channel",
        )
        .await;
    }

    Ok(StatusCode::OK)
}

/// Fire-and-forget ephemeral notice; its own failure is only logged.
async fn notify(state: &AppState, response_url: &str, text: &str) {
    if let Err(error) = state.slack().respond(response_url, text).await {
        warn!(error = %error, "failed to deliver notice to response_url");
    }
}
