//! Shared types and interfaces for the chat system.

pub mod errors;

pub use errors::{ChatError, ChatResult};

// Identifiers are opaque strings assigned by the store or the identity provider.
pub type ChatId = String;
pub type MessageId = String;
pub type UserId = String;
