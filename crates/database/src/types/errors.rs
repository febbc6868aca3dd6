//! Error types for the database layer

use courier_chats::ChatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    ConnectionError(String),

    #[error("database query error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    MigrationError(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("stored value is malformed: {0}")]
    DecodeError(String),
}

impl From<DatabaseError> for ChatError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UnknownUser(id) => ChatError::user_not_found(id),
            DatabaseError::NotFound(what) => ChatError::internal(format!("missing row: {what}")),
            other => ChatError::persistence(other.to_string()),
        }
    }
}
