//! Postgres-backed credential store.
//!
//! Queries are runtime-checked (`sqlx::query_as` with binds) so the workspace
//! builds without a live database.

use async_trait::async_trait;
use sqlx::PgPool;

use courier_core::{CredentialRecord, NewCredential, SlackUserId, TeamId};

use super::{CredentialStore, RepositoryError};

const RECORD_COLUMNS: &str = "id, access_token, bot_access_token, team_name, team_id, user_id";

/// [`CredentialStore`] over the `credentials` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_team_name(
        &self,
        team_name: &str,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM credentials WHERE team_name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(team_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_team_id(
        &self,
        team_id: &TeamId,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM credentials WHERE team_id = $1"
        ))
        .bind(team_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn upsert(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError> {
        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            "INSERT INTO credentials (access_token, bot_access_token, team_name, team_id, user_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (team_id) DO UPDATE
                 SET access_token = EXCLUDED.access_token,
                     bot_access_token = EXCLUDED.bot_access_token,
                     team_name = EXCLUDED.team_name,
                     user_id = EXCLUDED.user_id
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&credential.access_token)
        .bind(&credential.bot_access_token)
        .bind(&credential.team_name)
        .bind(credential.team_id.as_str())
        .bind(credential.user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "token already stored for another workspace".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        Ok(record)
    }

    async fn rename_team(
        &self,
        team_id: &TeamId,
        team_name: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE credentials SET team_name = $2 WHERE team_id = $1")
            .bind(team_id.as_str())
            .bind(team_name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(
        &self,
        team_id: &TeamId,
        user_id: &SlackUserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM credentials WHERE team_id = $1 AND user_id = $2")
            .bind(team_id.as_str())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
