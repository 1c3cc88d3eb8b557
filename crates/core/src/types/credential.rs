//! The persisted workspace credential record.

use serde::{Deserialize, Serialize};

use super::id::{SlackUserId, TeamId};

/// Credentials for one installed workspace.
///
/// One row per workspace: `team_id` is unique, so re-installing refreshes the
/// tokens in place instead of accumulating rows. `bot_access_token` is the
/// only credential used for outbound API calls after installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CredentialRecord {
    /// Database-generated primary key.
    pub id: i64,
    /// User-level OAuth access token of the installing user.
    pub access_token: String,
    /// Bot-level OAuth access token, used for all outbound API calls.
    pub bot_access_token: String,
    /// Workspace display name. Mutable: workspaces can be renamed.
    pub team_name: String,
    /// Immutable workspace identifier.
    pub team_id: TeamId,
    /// Slack user ID of the installing user.
    pub user_id: SlackUserId,
}

/// A credential record as produced by the OAuth exchange, before it has been
/// assigned a database ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub access_token: String,
    pub bot_access_token: String,
    pub team_name: String,
    pub team_id: TeamId,
    pub user_id: SlackUserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_record_serde() {
        let record = CredentialRecord {
            id: 7,
            access_token: "xoxp-user".to_owned(),
            bot_access_token: "xoxb-bot".to_owned(),
            team_name: "Acme".to_owned(),
            team_id: TeamId::new("T1"),
            user_id: SlackUserId::new("U1"),
        };

        let json = serde_json::to_value(&record).expect("serializes");
        assert_eq!(json["team_id"], "T1");
        assert_eq!(json["user_id"], "U1");

        let back: CredentialRecord = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, record);
    }
}
