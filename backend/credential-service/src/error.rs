use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CredentialError>;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Token audience doesn't match request audience")]
    AudienceMismatch,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction aborted: {0}")]
    Transaction(String),

    /// Session tokens were revoked but the identity token could not be cleared.
    #[error("Identity session reset failed: {0}")]
    SessionReset(String),

    #[error("Secure token generation failed: {0}")]
    Generation(String),

    #[error("Unsafe redirect: {0}")]
    UnsafeRedirect(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CredentialError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CredentialError::NotFound(_) => StatusCode::NOT_FOUND,
            CredentialError::Validation(_)
            | CredentialError::AudienceMismatch
            | CredentialError::UnsafeRedirect(_) => StatusCode::BAD_REQUEST,
            CredentialError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CredentialError::Forbidden(_) => StatusCode::FORBIDDEN,
            CredentialError::Database(_)
            | CredentialError::Transaction(_)
            | CredentialError::SessionReset(_)
            | CredentialError::Generation(_)
            | CredentialError::Transport(_)
            | CredentialError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::NotFound(_) => "not_found",
            CredentialError::Validation(_) => "validation_failed",
            CredentialError::AudienceMismatch => "audience_mismatch",
            CredentialError::Unauthorized(_) => "unauthorized",
            CredentialError::Forbidden(_) => "forbidden",
            CredentialError::UnsafeRedirect(_) => "unsafe_redirect",
            CredentialError::SessionReset(_) => "identity_reset_failed",
            CredentialError::Database(_)
            | CredentialError::Transaction(_)
            | CredentialError::Generation(_)
            | CredentialError::Transport(_)
            | CredentialError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to clients
    pub fn public_message(&self) -> String {
        match self {
            CredentialError::Database(_)
            | CredentialError::Transaction(_)
            | CredentialError::Generation(_)
            | CredentialError::Transport(_)
            | CredentialError::Internal(_) => "Internal server error".to_string(),
            CredentialError::SessionReset(_) => {
                "Session revoked but identity token reset failed; retry logout".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.code(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

// Conversions from external error types
impl From<sqlx::Error> for CredentialError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        CredentialError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CredentialError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CredentialError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for CredentialError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT rejected: {}", err);
        CredentialError::Unauthorized("Invalid token".to_string())
    }
}

impl From<lettre::error::Error> for CredentialError {
    fn from(err: lettre::error::Error) -> Self {
        CredentialError::Transport(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CredentialError {
    fn from(err: validator::ValidationErrors) -> Self {
        CredentialError::Validation(err.to_string())
    }
}
