use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{ChatId, UserId};

/// A conversation between two or more users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Chat {
    pub id: ChatId,
    /// Display name, required for groups
    pub name: Option<String>,
    pub is_group: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public profile of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Participant as listed on a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Chat with its full participant list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatDetails {
    #[serde(flatten)]
    pub chat: Chat,
    pub participants: Vec<Participant>,
}

/// Entry of a user's chat list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatSummary {
    pub id: ChatId,
    pub name: Option<String>,
    pub is_group: bool,
    pub avatar_url: Option<String>,
    /// Text of the newest message, if any
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// The counterpart of a direct chat
    pub other_user: Option<Participant>,
}

/// Request to create a chat
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateChatRequest {
    /// Users to add besides the creator
    pub participant_ids: Vec<UserId>,
    pub is_group: bool,
    pub name: Option<String>,
}

/// A validated chat ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub created_by: UserId,
    pub name: Option<String>,
    pub is_group: bool,
    /// Every member, creator included, without duplicates
    pub member_ids: Vec<UserId>,
}
