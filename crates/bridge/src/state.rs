//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::db::CredentialStore;
use crate::slack::{SenderResolver, SlackApi};

/// Application state shared across all handlers.
///
/// Constructed once at startup and passed by handle into every handler - no
/// ambient globals. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BridgeConfig,
    store: Arc<dyn CredentialStore>,
    slack: Arc<dyn SlackApi>,
    resolver: Arc<dyn SenderResolver>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        store: Arc<dyn CredentialStore>,
        slack: Arc<dyn SlackApi>,
        resolver: Arc<dyn SenderResolver>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                slack,
                resolver,
            }),
        }
    }

    /// Get a reference to the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Get a reference to the credential store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Get a reference to the Slack API client.
    #[must_use]
    pub fn slack(&self) -> &Arc<dyn SlackApi> {
        &self.inner.slack
    }

    /// Get a reference to the sender display-name resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn SenderResolver> {
        &self.inner.resolver
    }
}
