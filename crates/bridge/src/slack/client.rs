//! Slack Web API client.
//!
//! Implements [`SlackApi`](super::SlackApi) over HTTP. Every method takes the
//! workspace's bot token explicitly: the bridge serves many workspaces from
//! one process, so the client itself holds no credentials beyond the app's
//! OAuth client pair used for the install-time code exchange.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use courier_core::{ChannelId, SlackUserId};

use super::error::SlackError;
use super::types::{
    Channel, ChannelListResponse, HistoryMessage, HistoryResponse, OAuthAccess,
    OAuthAccessResponse, PostMessageResponse, UserInfo, UserInfoResponse,
};
use super::SlackApi;
use crate::config::SlackConfig;

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    /// HTTP client.
    client: Client,
    /// Web API base URL (`https://slack.com/api` outside of tests).
    base_url: String,
    /// OAuth client ID for `oauth.v2.access`.
    client_id: String,
    /// OAuth client secret for `oauth.v2.access`.
    client_secret: SecretString,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new Slack client from the app configuration.
    #[must_use]
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base.trim_end_matches('/').to_owned(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

/// Map the `{ok, error}` envelope to a result.
fn ensure_ok(ok: bool, api_error: Option<String>) -> Result<(), SlackError> {
    if ok {
        Ok(())
    } else {
        let code = api_error.unwrap_or_else(|| "unknown_error".to_owned());
        error!(code = %code, "Slack API returned an error");
        Err(SlackError::Api(code))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    #[instrument(skip(self, token, text), fields(channel = %channel))]
    async fn post_message(
        &self,
        token: &str,
        channel: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        let response = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;
        debug!(ts = ?result.ts, "message posted");
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn list_channels(&self, token: &str) -> Result<Vec<Channel>, SlackError> {
        let response = self
            .client
            .get(self.url("conversations.list"))
            .bearer_auth(token)
            .query(&[("types", "public_channel,private_channel")])
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: ChannelListResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;
        Ok(result.channels)
    }

    #[instrument(skip(self, token), fields(channel = %channel))]
    async fn history(
        &self,
        token: &str,
        channel: &ChannelId,
        oldest: &str,
        latest: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let response = self
            .client
            .get(self.url("conversations.history"))
            .bearer_auth(token)
            .query(&[
                ("channel", channel.as_str()),
                ("oldest", oldest),
                ("latest", latest),
            ])
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: HistoryResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;
        Ok(result.messages)
    }

    #[instrument(skip(self, token), fields(channel = %channel, ts = %thread_ts))]
    async fn thread_replies(
        &self,
        token: &str,
        channel: &ChannelId,
        thread_ts: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let response = self
            .client
            .get(self.url("conversations.replies"))
            .bearer_auth(token)
            .query(&[("channel", channel.as_str()), ("ts", thread_ts)])
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: HistoryResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;
        Ok(result.messages)
    }

    #[instrument(skip(self, token), fields(user = %user))]
    async fn user_info(&self, token: &str, user: &SlackUserId) -> Result<UserInfo, SlackError> {
        let response = self
            .client
            .get(self.url("users.info"))
            .bearer_auth(token)
            .query(&[("user", user.as_str())])
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;
        result
            .user
            .ok_or_else(|| SlackError::Response("users.info response missing user".to_owned()))
    }

    #[instrument(skip(self, code))]
    async fn exchange_oauth_code(&self, code: &str) -> Result<OAuthAccess, SlackError> {
        let response = self
            .client
            .post(self.url("oauth.v2.access"))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: OAuthAccessResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        ensure_ok(result.ok, result.error)?;

        let missing = |field: &str| {
            SlackError::Response(format!("oauth.v2.access response missing {field}"))
        };
        Ok(OAuthAccess {
            access_token: result.access_token.ok_or_else(|| missing("access_token"))?,
            team: result.team.ok_or_else(|| missing("team"))?,
            authed_user: result.authed_user.ok_or_else(|| missing("authed_user"))?,
        })
    }

    #[instrument(skip(self, text))]
    async fn respond(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        let response = self
            .client
            .post(response_url)
            .json(&serde_json::json!({
                "response_type": "ephemeral",
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Response(format!(
                "Response URL returned {status}: {body}"
            )));
        }

        debug!("responded to response_url");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn test_client(base_url: &str) -> SlackClient {
        SlackClient::new(&SlackConfig {
            client_id: "1234.5678".to_owned(),
            client_secret: SecretString::from("oauth-secret"),
            app_id: "A0KRD7HC3".to_owned(),
            signing_secret: SecretString::from("signing-secret"),
            api_base: base_url.to_owned(),
        })
    }

    #[tokio::test]
    async fn test_post_message_sends_bearer_token() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/chat.postMessage")
                    .header("authorization", "Bearer xoxb-token")
                    .json_body(json!({"channel": "C1", "text": "hi"}));
                then.status(200)
                    .json_body(json!({"ok": true, "channel": "C1", "ts": "1.0"}));
            });

        let client = test_client(&server.base_url());
        client
            .post_message("xoxb-token", "C1", "hi")
            .await
            .expect("message posts");

        mock.assert();
    }

    #[tokio::test]
    async fn test_post_message_maps_api_error_code() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/chat.postMessage");
                then.status(200)
                    .json_body(json!({"ok": false, "error": "channel_not_found"}));
            });

        let client = test_client(&server.base_url());
        let result = client.post_message("xoxb-token", "C404", "hi").await;

        match result {
            Err(SlackError::Api(code)) => assert_eq!(code, "channel_not_found"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_channels_requests_private_channels_too() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(GET)
                    .path("/conversations.list")
                    .query_param("types", "public_channel,private_channel");
                then.status(200).json_body(json!({
                    "ok": true,
                    "channels": [{"id": "C1", "name": "general"}]
                }));
            });

        let client = test_client(&server.base_url());
        let channels = client.list_channels("xoxb-token").await.expect("lists");

        assert_eq!(channels.len(), 1);
        assert_eq!(channels.first().unwrap().name, "general");
        mock.assert();
    }

    #[tokio::test]
    async fn test_history_passes_range_bounds() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(GET)
                    .path("/conversations.history")
                    .query_param("channel", "C1")
                    .query_param("oldest", "0")
                    .query_param("latest", "100");
                then.status(200).json_body(json!({
                    "ok": true,
                    "messages": [{"user": "U1", "text": "hi", "ts": "1.0"}]
                }));
            });

        let client = test_client(&server.base_url());
        let messages = client
            .history("xoxb-token", &ChannelId::new("C1"), "0", "100")
            .await
            .expect("fetches history");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages.first().unwrap().ts, "1.0");
        mock.assert();
    }

    #[tokio::test]
    async fn test_user_info_resolves_name() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(GET)
                    .path("/users.info")
                    .query_param("user", "U1");
                then.status(200).json_body(json!({
                    "ok": true,
                    "user": {"id": "U1", "name": "alice", "real_name": "Alice Doe"}
                }));
            });

        let client = test_client(&server.base_url());
        let user = client
            .user_info("xoxb-token", &SlackUserId::new("U1"))
            .await
            .expect("resolves");

        assert_eq!(user.name, "alice");
    }

    #[tokio::test]
    async fn test_exchange_oauth_code_sends_client_pair() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/oauth.v2.access")
                    .body_includes("client_id=1234.5678")
                    .body_includes("client_secret=oauth-secret")
                    .body_includes("code=XYZ");
                then.status(200).json_body(json!({
                    "ok": true,
                    "access_token": "xoxb-new",
                    "team": {"id": "T1", "name": "Acme"},
                    "authed_user": {"id": "U1", "access_token": "xoxp-new"}
                }));
            });

        let client = test_client(&server.base_url());
        let access = client.exchange_oauth_code("XYZ").await.expect("exchanges");

        assert_eq!(access.access_token, "xoxb-new");
        assert_eq!(access.team.id.as_str(), "T1");
        assert_eq!(access.authed_user.access_token, "xoxp-new");
        mock.assert();
    }

    #[tokio::test]
    async fn test_exchange_oauth_code_invalid_code() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/oauth.v2.access");
                then.status(200)
                    .json_body(json!({"ok": false, "error": "invalid_code"}));
            });

        let client = test_client(&server.base_url());
        let result = client.exchange_oauth_code("bad").await;

        match result {
            Err(SlackError::Api(code)) => assert_eq!(code, "invalid_code"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_respond_posts_ephemeral_payload() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST).path("/hooks/T1/B1").json_body(json!({
                    "response_type": "ephemeral",
                    "text": "The bot *is not* a member of the channel"
                }));
                then.status(200).body("ok");
            });

        let client = test_client(&server.base_url());
        client
            .respond(
                &server.url("/hooks/T1/B1"),
                "The bot *is not* a member of the channel",
            )
            .await
            .expect("responds");

        mock.assert();
    }
}
