//! Slack integration for the bridge.
//!
//! This module provides:
//! - [`SlackApi`], the narrow interface over the Slack Web API calls the
//!   bridge makes, so handlers can run against fakes in tests
//! - [`SlackClient`], the HTTP implementation
//! - [`SenderResolver`] for turning Slack user IDs into display names
//! - Event delivery signature verification

mod client;
mod error;
mod signature;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{ChannelId, SlackUserId};

pub use client::SlackClient;
pub use error::SlackError;
pub use signature::verify_signature;
pub use types::{
    Channel, ChannelListResponse, HistoryMessage, HistoryResponse, OAuthAccess,
    OAuthAccessResponse, OAuthAuthedUser, OAuthTeam, PostMessageResponse, UserInfo,
    UserInfoResponse,
};

/// The Slack Web API operations the bridge depends on.
///
/// Every method takes the workspace's bot token; implementations hold no
/// per-workspace state. Slack's `{ok: false, error}` envelope surfaces as
/// [`SlackError::Api`] carrying the error code.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Post a plain text message to a channel (`chat.postMessage`).
    async fn post_message(&self, token: &str, channel: &str, text: &str)
    -> Result<(), SlackError>;

    /// List public and private channels visible to the bot
    /// (`conversations.list`).
    async fn list_channels(&self, token: &str) -> Result<Vec<Channel>, SlackError>;

    /// Fetch a channel's message history bounded by `oldest`/`latest`
    /// timestamps (`conversations.history`).
    async fn history(
        &self,
        token: &str,
        channel: &ChannelId,
        oldest: &str,
        latest: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError>;

    /// Fetch a thread's messages, parent first (`conversations.replies`).
    async fn thread_replies(
        &self,
        token: &str,
        channel: &ChannelId,
        thread_ts: &str,
    ) -> Result<Vec<HistoryMessage>, SlackError>;

    /// Look up a user (`users.info`).
    async fn user_info(&self, token: &str, user: &SlackUserId) -> Result<UserInfo, SlackError>;

    /// Exchange an OAuth authorization code for workspace tokens
    /// (`oauth.v2.access`).
    async fn exchange_oauth_code(&self, code: &str) -> Result<OAuthAccess, SlackError>;

    /// POST an ephemeral notice to a caller-supplied `response_url`.
    async fn respond(&self, response_url: &str, text: &str) -> Result<(), SlackError>;
}

/// Resolves a message sender's Slack user ID to a display name.
///
/// This is a separate seam from [`SlackApi`] so a caching variant can be
/// swapped in without touching handler logic. The default implementation
/// performs one `users.info` call per invocation.
#[async_trait]
pub trait SenderResolver: Send + Sync {
    /// Resolve `user` to a display name using the workspace's bot token.
    async fn resolve(&self, token: &str, user: &SlackUserId) -> Result<String, SlackError>;
}

/// [`SenderResolver`] that asks the API every time, with no caching.
pub struct ApiSenderResolver {
    api: Arc<dyn SlackApi>,
}

impl ApiSenderResolver {
    /// Create a resolver backed by the given API client.
    #[must_use]
    pub fn new(api: Arc<dyn SlackApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SenderResolver for ApiSenderResolver {
    async fn resolve(&self, token: &str, user: &SlackUserId) -> Result<String, SlackError> {
        let info = self.api.user_info(token, user).await?;
        Ok(info.name)
    }
}
