//! Errors returned by the authentication core and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authenticated user is required")]
    AuthorizationRequired,

    #[error("only staff users can create new users")]
    InsufficientPrivilege,

    #[error("username is already taken")]
    DuplicateUsername,

    #[error("username must not be empty")]
    InvalidUsername,

    #[error("missing token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("failed to generate token: {0}")]
    EntropyUnavailable(#[source] rand::Error),

    #[error("{op} failed: {source}")]
    StoreUnavailable {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AuthError {
    pub fn store(op: &'static str, source: StoreError) -> Self {
        AuthError::StoreUnavailable { op, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::AuthorizationRequired
            | AuthError::MissingToken
            | AuthError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPrivilege => StatusCode::FORBIDDEN,
            AuthError::DuplicateUsername => StatusCode::CONFLICT,
            AuthError::InvalidUsername | AuthError::InvalidUserId(_) => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::EntropyUnavailable(_) | AuthError::StoreUnavailable { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::AuthorizationRequired => "authorization_required",
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidOrExpiredToken => "invalid_token",
            AuthError::InsufficientPrivilege => "insufficient_privilege",
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::InvalidUsername | AuthError::InvalidUserId(_) => "bad_request",
            AuthError::UserNotFound => "not_found",
            AuthError::EntropyUnavailable(_) | AuthError::StoreUnavailable { .. } => {
                "internal_error"
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            None
        } else {
            Some(self.to_string())
        };
        let body = ErrorResponse {
            error: self.code(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
