//! Domain error taxonomy shared by every handler.
//!
//! Each variant carries a stable machine-readable kind tag alongside the
//! human-readable message, and the response body always has the shape
//! `{"error": <kind>, "message": <text>}` so clients can branch on the kind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A field failed the rules in `users::validate`; the message names it.
    #[error("{0}")]
    Validation(String),

    /// Unknown email and wrong password collapse into this one kind so the
    /// login path cannot be used to enumerate accounts.
    #[error("incorrect email or password")]
    IncorrectCredentials,

    #[error("account has not been activated")]
    AccountNotActivated,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is invalid")]
    TokenInvalid,

    #[error("{resource} not found for {attribute}")]
    NotFound {
        resource: &'static str,
        attribute: &'static str,
    },

    /// Patch body was empty or contained a field outside the accepted set.
    #[error("invalid update")]
    InvalidUpdate,

    #[error("authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::IncorrectCredentials => "incorrect_credentials",
            ApiError::AccountNotActivated => "account_not_activated",
            ApiError::TokenExpired => "token_expired",
            ApiError::TokenInvalid => "token_invalid",
            ApiError::NotFound { .. } => "resource_not_found",
            ApiError::InvalidUpdate => "invalid_update",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Log the real cause, answer with a generic message.
            ApiError::Internal(err) => {
                error!(error = %err, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            self.status(),
            Json(serde_json::json!({
                "error": self.kind(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.into())
    }
}
