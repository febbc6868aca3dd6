//! Data access abstractions for the chat system.
//!
//! The delivery core only knows these traits; `courier-database` provides
//! the SQLite implementations and tests substitute mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::entities::{Chat, ChatDetails, ChatMessage, ChatSummary, NewChat, NewMessage, UserProfile};
use crate::types::ChatResult;

/// Answers whether a user may read and write a chat
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn is_member(&self, user_id: &str, chat_id: &str) -> ChatResult<bool>;
}

/// Durable message storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message atomically and return the canonical, hydrated record
    async fn persist(&self, message: &NewMessage) -> ChatResult<ChatMessage>;

    /// Messages of a chat, newest first, optionally strictly older than `before`
    async fn history(
        &self,
        chat_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> ChatResult<Vec<ChatMessage>>;

    /// Commit timestamp of a message inside a chat
    async fn created_at(&self, chat_id: &str, message_id: &str) -> ChatResult<Option<DateTime<Utc>>>;
}

/// Chat and user lookups backing the CRUD surface
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn find_direct_chat(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Chat>>;

    async fn create_chat(&self, chat: &NewChat) -> ChatResult<Chat>;

    async fn chat_details(&self, chat_id: &str) -> ChatResult<Option<ChatDetails>>;

    async fn list_chats(&self, user_id: &str) -> ChatResult<Vec<ChatSummary>>;

    async fn find_user(&self, user_id: &str) -> ChatResult<Option<UserProfile>>;

    async fn search_users(&self, query: &str, limit: u32) -> ChatResult<Vec<UserProfile>>;
}
