//! Shared types for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, Utc};

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Fixed-width RFC 3339 text so stored timestamps sort lexically
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DecodeError(format!("timestamp {raw:?}: {e}")))
}
