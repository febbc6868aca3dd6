//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_auth::AuthError;
use courier_chats::ChatError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Permission denied: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InternalError(_) | GatewayError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "unauthenticated",
            GatewayError::AuthorizationFailed(_) => "permission_denied",
            GatewayError::InvalidRequest(_) => "invalid_argument",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::InternalError(_) | GatewayError::DatabaseError(_) => "internal",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            ChatError::PermissionDenied { reason } => GatewayError::AuthorizationFailed(reason),
            ChatError::ChatNotFound { id } => GatewayError::NotFound(format!("chat {id}")),
            ChatError::UserNotFound { id } => GatewayError::NotFound(format!("user {id}")),
            ChatError::Persistence { message } => GatewayError::DatabaseError(message),
            ChatError::Internal { message } => GatewayError::InternalError(message),
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::InvalidSession => {
                GatewayError::AuthenticationFailed(error.to_string())
            }
            AuthError::UnknownUser(id) => GatewayError::NotFound(format!("user {id}")),
            AuthError::Database(e) => GatewayError::DatabaseError(e.to_string()),
        }
    }
}
