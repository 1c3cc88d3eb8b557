//! Database operations for the bridge `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `credentials` - Per-workspace OAuth tokens captured at install time.
//!   This is the bridge's only persisted state; messages, channels, and user
//!   data are always fetched live from Slack.
//!
//! # Migrations
//!
//! Migrations live in `crates/bridge/migrations/` and are embedded into the
//! binary with `sqlx::migrate!`. They run automatically at startup, so the
//! schema exists before the first request is served.

pub mod credentials;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use courier_core::{CredentialRecord, NewCredential, SlackUserId, TeamId};

pub use credentials::PgCredentialStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violation (e.g., a token already stored for another
    /// workspace).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence seam for workspace credentials.
///
/// The Postgres implementation is [`PgCredentialStore`]; tests substitute an
/// in-memory fake. Mutations that match nothing are no-ops, mirroring how
/// platform lifecycle events may arrive for workspaces this bridge never
/// stored.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a workspace by display name. Display names are not unique;
    /// the first match (lowest ID) wins.
    async fn find_by_team_name(
        &self,
        team_name: &str,
    ) -> Result<Option<CredentialRecord>, RepositoryError>;

    /// Look up a workspace by its immutable ID.
    async fn find_by_team_id(
        &self,
        team_id: &TeamId,
    ) -> Result<Option<CredentialRecord>, RepositoryError>;

    /// Insert credentials for a newly installed workspace, or refresh them in
    /// place when the workspace is already installed.
    async fn upsert(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError>;

    /// Update a workspace's display name. No-op when the workspace is
    /// unknown.
    async fn rename_team(&self, team_id: &TeamId, team_name: &str)
    -> Result<(), RepositoryError>;

    /// Delete the credentials matching `(team_id, user_id)`. No-op when
    /// nothing matches.
    async fn delete(&self, team_id: &TeamId, user_id: &SlackUserId)
    -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
