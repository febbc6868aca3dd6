use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{ChatResult, ChatId, MessageId, UserId};
use crate::utils::Validator;

/// A persisted chat message, hydrated with its sender's profile.
///
/// Records are immutable once the store hands them back; the delivery
/// path shares them between subscribers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Server-assigned identifier
    pub id: MessageId,
    /// Chat this message belongs to
    pub chat_id: ChatId,
    /// Sender's user id
    pub sender_id: UserId,
    /// Sender's display name at the time of the read
    pub sender_name: String,
    /// Sender's avatar url
    pub sender_avatar: Option<String>,
    /// Text body
    pub content: Option<String>,
    /// Attached media
    pub media: Option<MediaRef>,
    /// Store commit timestamp, authoritative for ordering
    pub created_at: DateTime<Utc>,
}

/// Reference to an uploaded media object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MediaRef {
    pub url: String,
    /// MIME type or coarse kind (`image/png`, `video`, ...)
    pub kind: Option<String>,
}

/// A message that passed validation and is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: Option<String>,
    pub media: Option<MediaRef>,
}

impl NewMessage {
    /// Build a draft, normalizing empty strings to absent values.
    ///
    /// Fails when neither text nor media remains.
    pub fn new(
        chat_id: impl Into<ChatId>,
        sender_id: impl Into<UserId>,
        content: Option<String>,
        media: Option<MediaRef>,
    ) -> ChatResult<Self> {
        let content = content.filter(|text| !text.is_empty());
        let media = media
            .filter(|media| !media.url.is_empty())
            .map(|media| MediaRef {
                kind: media.kind.filter(|kind| !kind.is_empty()),
                ..media
            });

        Validator::message_body(content.as_deref(), media.as_ref())?;

        Ok(Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            content,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatError;

    #[test]
    fn empty_content_counts_as_missing() {
        let result = NewMessage::new("c1", "u1", Some(String::new()), None);
        assert!(matches!(result, Err(ChatError::Validation { .. })));
    }

    #[test]
    fn media_only_message_is_accepted() {
        let media = MediaRef {
            url: "https://cdn.example.com/a.png".to_string(),
            kind: Some(String::new()),
        };
        let draft = NewMessage::new("c1", "u1", None, Some(media)).unwrap();

        assert!(draft.content.is_none());
        let media = draft.media.unwrap();
        assert_eq!(media.url, "https://cdn.example.com/a.png");
        assert!(media.kind.is_none());
    }

    #[test]
    fn media_without_url_is_dropped() {
        let media = MediaRef {
            url: String::new(),
            kind: Some("image/png".to_string()),
        };
        let draft = NewMessage::new("c1", "u1", Some("hi".to_string()), Some(media)).unwrap();
        assert!(draft.media.is_none());
        assert_eq!(draft.content.as_deref(), Some("hi"));
    }
}
