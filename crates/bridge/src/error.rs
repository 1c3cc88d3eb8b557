//! Unified request error handling.
//!
//! Provides the `AppError` type returned by every route handler. Errors are
//! rendered at the HTTP boundary as the bridge's `{type, text}` JSON body so
//! callers can branch on `type` without parsing prose.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::slack::SlackError;

/// Application-level error type for the bridge.
#[derive(Debug, Error)]
pub enum AppError {
    /// No credential record matches the requested workspace name.
    #[error("Team not found")]
    TeamNotFound,

    /// The requested channel does not exist in the workspace.
    #[error("Channel not found")]
    ChannelNotFound,

    /// The bot is not a member of the target channel.
    #[error("The bot is not a member of the channel")]
    NotInChannel,

    /// A Slack call failed in a way the bridge does not model:
    /// an unhandled API error code, or a transport/parse failure.
    #[error("Slack error: {0}")]
    Platform(#[from] SlackError),

    /// Credential store operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Event delivery failed signature verification.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// The `{type, text}` error body every error response carries.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            Self::TeamNotFound | Self::ChannelNotFound => "not_found",
            Self::NotInChannel => "not_in_channel",
            Self::Platform(_) => "platform_error",
            Self::Repository(_) => "internal",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::TeamNotFound
            | Self::ChannelNotFound
            | Self::NotInChannel
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Platform(_) => StatusCode::BAD_GATEWAY,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Platform(_) | Self::Repository(_)) {
            tracing::error!(error = %self, "Request error");
        }

        // Don't expose internal error details to clients
        let text = match &self {
            Self::Repository(_) => "Internal server error".to_owned(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            kind: self.kind().to_owned(),
            text,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        assert_eq!(AppError::TeamNotFound.to_string(), "Team not found");
        assert_eq!(AppError::ChannelNotFound.to_string(), "Channel not found");
        assert_eq!(
            AppError::NotInChannel.to_string(),
            "The bot is not a member of the channel"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::TeamNotFound), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::ChannelNotFound),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::NotInChannel), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Platform(SlackError::Api("ratelimited".to_owned()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Unauthorized("bad signature".to_owned())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            kind: "not_found".to_owned(),
            text: "Team not found".to_owned(),
        };
        let json = serde_json::to_string(&body).expect("serializes");
        assert_eq!(json, r#"{"type":"not_found","text":"Team not found"}"#);
    }

    #[test]
    fn test_repository_errors_are_opaque() {
        let err = AppError::Repository(RepositoryError::Conflict("token reuse".to_owned()));
        assert_eq!(err.kind(), "internal");
        // The client-facing text never carries database details
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
