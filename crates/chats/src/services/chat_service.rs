//! Chat and user directory operations.

use std::sync::Arc;

use tracing::info;

use crate::entities::{Chat, ChatDetails, ChatSummary, CreateChatRequest, UserProfile};
use crate::repositories::{ChatDirectory, MembershipOracle};
use crate::types::{ChatError, ChatResult};
use crate::utils::Validator;

const USER_SEARCH_LIMIT: u32 = 20;

/// Service for chat creation, listing and user lookups
pub struct ChatService {
    directory: Arc<dyn ChatDirectory>,
    membership: Arc<dyn MembershipOracle>,
}

impl ChatService {
    pub fn new(directory: Arc<dyn ChatDirectory>, membership: Arc<dyn MembershipOracle>) -> Self {
        Self {
            directory,
            membership,
        }
    }

    /// Create a chat, or return the existing direct chat between the same two users
    pub async fn create_chat(&self, creator_id: &str, request: CreateChatRequest) -> ChatResult<Chat> {
        let new_chat = Validator::new_chat(creator_id, request)?;

        if !new_chat.is_group {
            if let Some(other) = new_chat.member_ids.get(1) {
                if let Some(existing) = self.directory.find_direct_chat(creator_id, other).await? {
                    return Ok(existing);
                }
            }
        }

        let chat = self.directory.create_chat(&new_chat).await?;
        info!(
            chat_id = %chat.id,
            created_by = creator_id,
            members = new_chat.member_ids.len(),
            is_group = chat.is_group,
            "chat created"
        );
        Ok(chat)
    }

    /// Chat details for a member. Unknown ids are not found for everyone.
    pub async fn get_chat(&self, user_id: &str, chat_id: &str) -> ChatResult<ChatDetails> {
        let details = self
            .directory
            .chat_details(chat_id)
            .await?
            .ok_or_else(|| ChatError::chat_not_found(chat_id))?;

        if !self.membership.is_member(user_id, chat_id).await? {
            return Err(ChatError::not_a_member());
        }

        Ok(details)
    }

    pub async fn list_chats(&self, user_id: &str) -> ChatResult<Vec<ChatSummary>> {
        self.directory.list_chats(user_id).await
    }

    pub async fn profile(&self, user_id: &str) -> ChatResult<UserProfile> {
        self.directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| ChatError::user_not_found(user_id))
    }

    /// Users whose name or email contains `query`
    pub async fn search_users(&self, query: &str) -> ChatResult<Vec<UserProfile>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.directory.search_users(query, USER_SEARCH_LIMIT).await
    }
}
