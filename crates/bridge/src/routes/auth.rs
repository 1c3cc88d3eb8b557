//! OAuth install callback route handler.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use courier_core::NewCredential;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Slack's fixed deep-link back into the installed app.
const APP_REDIRECT_URL: &str = "https://slack.com/app_redirect";

/// Query parameters from the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// Error code if the user declined the installation.
    pub error: Option<String>,
}

/// Handle the OAuth install callback.
///
/// # Route
///
/// `GET,POST /auth`
///
/// A declined installation redirects straight back to the app. A granted one
/// exchanges the code, stores (or refreshes) the workspace's credential
/// record, and redirects back to the app with the workspace ID attached.
/// Both redirects are 302s, matching what Slack's install flow expects.
#[instrument(skip(state, query))]
pub async fn authorize(
    State(state): State<AppState>,
    Query(query): Query<AuthCallbackQuery>,
) -> Result<Response> {
    let app_id = &state.config().slack.app_id;

    if let Some(error) = query.error {
        warn!(error = %error, "workspace installation declined");
        return Ok(redirect_found(&format!("{APP_REDIRECT_URL}?app={app_id}")));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing code parameter".to_owned()))?;

    let access = state.slack().exchange_oauth_code(&code).await?;

    let record = state
        .store()
        .upsert(NewCredential {
            access_token: access.authed_user.access_token,
            bot_access_token: access.access_token,
            team_name: access.team.name,
            team_id: access.team.id,
            user_id: access.authed_user.id,
        })
        .await?;

    info!(team_id = %record.team_id, team_name = %record.team_name, "workspace installed");

    Ok(redirect_found(&format!(
        "{APP_REDIRECT_URL}?team={}&app={app_id}",
        record.team_id
    )))
}

/// Build a 302 Found redirect.
///
/// `axum::response::Redirect` only offers 303/307/308; the install flow uses
/// a plain 302.
fn redirect_found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_owned())],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_found_status_and_location() {
        let response = redirect_found("https://slack.com/app_redirect?app=A1");
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok());
        assert_eq!(location, Some("https://slack.com/app_redirect?app=A1"));
    }
}
