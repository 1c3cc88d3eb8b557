//! Integration test harness for Courier.
//!
//! Builds the full bridge router over in-process fakes:
//!
//! - [`FakeSlack`] stands in for the Slack Web API, recording every call and
//!   returning scripted responses
//! - [`MemoryStore`] replaces the Postgres credential store
//!
//! Tests drive the router with `tower::ServiceExt::oneshot`, so the whole
//! HTTP surface - extractors, handlers, error mapping - is exercised without
//! a network or a database.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode, header};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tower::ServiceExt;

use courier_bridge::config::{BridgeConfig, DatabaseConfig, SlackConfig};
use courier_bridge::db::{CredentialStore, RepositoryError};
use courier_bridge::slack::{
    ApiSenderResolver, Channel, HistoryMessage, OAuthAccess, OAuthAuthedUser, OAuthTeam, SlackApi,
    SlackError, UserInfo,
};
use courier_bridge::state::AppState;
use courier_core::{ChannelId, CredentialRecord, NewCredential, SlackUserId, TeamId};

/// Signing secret the test configuration uses for `/slack/event`.
pub const SIGNING_SECRET: &str = "test-signing-secret";

/// App ID the test configuration uses for `app_redirect` URLs.
pub const APP_ID: &str = "A0KRD7HC3";

// =============================================================================
// Fake Slack API
// =============================================================================

/// A recorded `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub token: String,
    pub channel: String,
    pub text: String,
}

/// A recorded `response_url` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedResponse {
    pub response_url: String,
    pub text: String,
}

/// Scripted in-process stand-in for the Slack Web API.
///
/// Error fields hold Slack API error codes; when set, the corresponding call
/// fails with `SlackError::Api(code)`.
#[derive(Default)]
pub struct FakeSlack {
    pub posts: Mutex<Vec<RecordedPost>>,
    pub post_error: Mutex<Option<String>>,
    pub channels: Mutex<Vec<Channel>>,
    pub list_error: Mutex<Option<String>>,
    pub history: Mutex<Vec<HistoryMessage>>,
    pub history_error: Mutex<Option<String>>,
    /// Thread replies keyed by `thread_ts`, parent first.
    pub replies: Mutex<HashMap<String, Vec<HistoryMessage>>>,
    /// Display names keyed by user ID.
    pub users: Mutex<HashMap<String, String>>,
    /// Number of `users.info` calls observed.
    pub user_info_calls: AtomicUsize,
    pub oauth_access: Mutex<Option<OAuthAccess>>,
    pub exchanged_codes: Mutex<Vec<String>>,
    pub responses: Mutex<Vec<RecordedResponse>>,
}

impl FakeSlack {
    /// Script the next `chat.postMessage` calls to fail with `code`.
    pub fn fail_posts_with(&self, code: &str) {
        *self.post_error.lock().unwrap() = Some(code.to_owned());
    }

    /// Script `conversations.list` to fail with `code`.
    pub fn fail_list_with(&self, code: &str) {
        *self.list_error.lock().unwrap() = Some(code.to_owned());
    }

    /// Script `conversations.history` to fail with `code`.
    pub fn fail_history_with(&self, code: &str) {
        *self.history_error.lock().unwrap() = Some(code.to_owned());
    }

    /// Make a channel visible to the bot.
    pub fn add_channel(&self, id: &str, name: &str) {
        self.channels.lock().unwrap().push(Channel {
            id: ChannelId::new(id),
            name: name.to_owned(),
        });
    }

    /// Register a user's display name for `users.info`.
    pub fn add_user(&self, id: &str, name: &str) {
        self.users.lock().unwrap().insert(id.to_owned(), name.to_owned());
    }

    /// Set the channel history returned by `conversations.history`.
    pub fn set_history(&self, messages: Vec<HistoryMessage>) {
        *self.history.lock().unwrap() = messages;
    }

    /// Set the replies for a thread, parent first.
    pub fn set_replies(&self, thread_ts: &str, messages: Vec<HistoryMessage>) {
        self.replies
            .lock()
            .unwrap()
            .insert(thread_ts.to_owned(), messages);
    }

    /// Script the OAuth code exchange result.
    pub fn set_oauth_access(&self, access: OAuthAccess) {
        *self.oauth_access.lock().unwrap() = Some(access);
    }
}

/// Build a history message fixture, optionally threaded.
#[must_use]
pub fn history_message(text: &str, user: &str, ts: &str, thread_ts: Option<&str>) -> HistoryMessage {
    let mut message = HistoryMessage::plain(text, user, ts);
    message.thread_ts = thread_ts.map(str::to_owned);
    message
}

/// Build an OAuth access fixture.
#[must_use]
pub fn oauth_access(
    bot_token: &str,
    team_id: &str,
    team_name: &str,
    user_id: &str,
    user_token: &str,
) -> OAuthAccess {
    OAuthAccess {
        access_token: bot_token.to_owned(),
        team: OAuthTeam {
            id: TeamId::new(team_id),
            name: team_name.to_owned(),
        },
        authed_user: OAuthAuthedUser {
            id: SlackUserId::new(user_id),
            access_token: user_token.to_owned(),
        },
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn post_message(
        &self,
        token: &str,
        channel: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        self.posts.lock().unwrap().push(RecordedPost {
            token: token.to_owned(),
            channel: channel.to_owned(),
            text: text.to_owned(),
        });
        match self.post_error.lock().unwrap().clone() {
            Some(code) => Err(SlackError::Api(code)),
            None => Ok(()),
        }
    }

    async fn list_channels(&self, _token: &str) -> Result<Vec<Channel>, SlackError> {
        if let Some(code) = self.list_error.lock().unwrap().clone() {
            return Err(SlackError::Api(code));
        }
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn history(
        &self,
        _token: &str,
        _channel: &ChannelId,
        _oldest: &str,
        _latest: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        if let Some(code) = self.history_error.lock().unwrap().clone() {
            return Err(SlackError::Api(code));
        }
        Ok(self.history.lock().unwrap().clone())
    }

    async fn thread_replies(
        &self,
        _token: &str,
        _channel: &ChannelId,
        thread_ts: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(thread_ts)
            .cloned()
            .unwrap_or_default())
    }

    async fn user_info(&self, _token: &str, user: &SlackUserId) -> Result<UserInfo, SlackError> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        let name = self
            .users
            .lock()
            .unwrap()
            .get(user.as_str())
            .cloned()
            .ok_or_else(|| SlackError::Api("user_not_found".to_owned()))?;
        Ok(UserInfo {
            id: user.clone(),
            name,
        })
    }

    async fn exchange_oauth_code(&self, code: &str) -> Result<OAuthAccess, SlackError> {
        self.exchanged_codes.lock().unwrap().push(code.to_owned());
        self.oauth_access
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SlackError::Api("invalid_code".to_owned()))
    }

    async fn respond(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        self.responses.lock().unwrap().push(RecordedResponse {
            response_url: response_url.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}

// =============================================================================
// In-memory credential store
// =============================================================================

/// In-memory [`CredentialStore`] with the same upsert semantics as the
/// Postgres implementation.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CredentialRecord>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    /// Seed a workspace record directly, bypassing the trait.
    pub fn seed(&self, team_name: &str, team_id: &str, user_id: &str, bot_token: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.lock().unwrap().push(CredentialRecord {
            id,
            access_token: format!("xoxp-{id}"),
            bot_access_token: bot_token.to_owned(),
            team_name: team_name.to_owned(),
            team_id: TeamId::new(team_id),
            user_id: SlackUserId::new(user_id),
        });
    }

    /// Snapshot of all stored records.
    #[must_use]
    pub fn records(&self) -> Vec<CredentialRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Look up a record by workspace ID, bypassing the trait.
    #[must_use]
    pub fn get(&self, team_id: &str) -> Option<CredentialRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.team_id.as_str() == team_id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_team_name(
        &self,
        team_name: &str,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.team_name == team_name)
            .min_by_key(|r| r.id)
            .cloned())
    }

    async fn find_by_team_id(
        &self,
        team_id: &TeamId,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        Ok(self.get(team_id.as_str()))
    }

    async fn upsert(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.team_id == credential.team_id)
        {
            existing.access_token = credential.access_token;
            existing.bot_access_token = credential.bot_access_token;
            existing.team_name = credential.team_name;
            existing.user_id = credential.user_id;
            return Ok(existing.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = CredentialRecord {
            id,
            access_token: credential.access_token,
            bot_access_token: credential.bot_access_token,
            team_name: credential.team_name,
            team_id: credential.team_id,
            user_id: credential.user_id,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn rename_team(
        &self,
        team_id: &TeamId,
        team_name: &str,
    ) -> Result<(), RepositoryError> {
        for record in self
            .records
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|r| &r.team_id == team_id)
        {
            record.team_name = team_name.to_owned();
        }
        Ok(())
    }

    async fn delete(
        &self,
        team_id: &TeamId,
        user_id: &SlackUserId,
    ) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .unwrap()
            .retain(|r| !(&r.team_id == team_id && &r.user_id == user_id));
        Ok(())
    }
}

// =============================================================================
// Test application
// =============================================================================

/// Bridge configuration used by the tests. The database parameters are inert
/// because the store is replaced with [`MemoryStore`].
#[must_use]
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        host: "127.0.0.1".parse().expect("loopback parses"),
        port: 0,
        database: DatabaseConfig {
            username: "courier".to_owned(),
            password: SecretString::from("unused"),
            host: "localhost".to_owned(),
            port: 5432,
            name: "courier_test".to_owned(),
        },
        slack: SlackConfig {
            client_id: "1234.5678".to_owned(),
            client_secret: SecretString::from("test-client-secret"),
            app_id: APP_ID.to_owned(),
            signing_secret: SecretString::from(SIGNING_SECRET),
            api_base: "https://slack.invalid/api".to_owned(),
        },
    }
}

/// The bridge router wired to fakes, plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub slack: Arc<FakeSlack>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let slack = Arc::new(FakeSlack::default());
        let store = Arc::new(MemoryStore::default());
        let api: Arc<dyn SlackApi> = slack.clone();
        let resolver = Arc::new(ApiSenderResolver::new(api.clone()));
        let state = AppState::new(test_config(), store.clone(), api, resolver);

        Self {
            router: courier_bridge::app(state),
            slack,
            store,
        }
    }

    /// Drive one request through the full router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Request and response helpers
// =============================================================================

/// Build a GET request.
#[must_use]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

/// Build a POST request with a JSON body.
#[must_use]
pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// Build a POST request with a form-encoded body.
#[must_use]
pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .expect("request builds")
}

/// Build a correctly signed `/slack/event` delivery.
#[must_use]
pub fn signed_event(body: &serde_json::Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time after epoch")
        .as_secs()
        .to_string();
    let signature = sign_event(&timestamp, &body);

    Request::builder()
        .method("POST")
        .uri("/slack/event")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Slack-Request-Timestamp", timestamp)
        .header("X-Slack-Signature", signature)
        .body(Body::from(body))
        .expect("request builds")
}

/// Compute the `v0=` signature Slack would attach to a delivery.
#[must_use]
pub fn sign_event(timestamp: &str, body: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(SIGNING_SECRET.as_bytes()).expect("valid key length");
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects")
}

/// Collect and parse a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Assert a `{type, text}` error body.
pub async fn assert_error_body(response: Response<Body>, status: StatusCode, kind: &str, text: &str) {
    assert_eq!(response.status(), status);
    let body = body_json(response).await;
    assert_eq!(body["type"], kind);
    assert_eq!(body["text"], text);
}
