//! Error types for the chat system.

use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Chat not found: {id}")]
    ChatNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ChatError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a permission denied error
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied { reason: reason.into() }
    }

    /// The denial surfaced whenever a caller touches a chat they do not belong to
    pub fn not_a_member() -> Self {
        Self::permission_denied("not a member of this chat")
    }

    /// Create a not found error for chats
    pub fn chat_not_found(id: impl Into<String>) -> Self {
        Self::ChatNotFound { id: id.into() }
    }

    /// Create a not found error for users
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::UserNotFound { id: id.into() }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
