//! Validation utilities.

use crate::entities::{CreateChatRequest, MediaRef, NewChat};
use crate::types::{ChatError, ChatResult};

const MAX_MESSAGE_LENGTH: usize = 100_000;
const MAX_CHAT_NAME_LENGTH: usize = 255;
const MAX_FILE_NAME_LENGTH: usize = 255;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// A message needs text, media, or both
    pub fn message_body(content: Option<&str>, media: Option<&MediaRef>) -> ChatResult<()> {
        if content.is_none() && media.is_none() {
            return Err(ChatError::validation("message must have content or media"));
        }

        if content.is_some_and(|text| text.len() > MAX_MESSAGE_LENGTH) {
            return Err(ChatError::validation(
                "message content too long (max 100,000 characters)",
            ));
        }

        Ok(())
    }

    /// Validate a chat creation request and resolve its final member list
    pub fn new_chat(creator: &str, request: CreateChatRequest) -> ChatResult<NewChat> {
        let mut others: Vec<String> = Vec::with_capacity(request.participant_ids.len());
        for id in request.participant_ids {
            if id.is_empty() || id == creator || others.contains(&id) {
                continue;
            }
            others.push(id);
        }

        if others.is_empty() {
            return Err(ChatError::validation("at least one participant required"));
        }

        if !request.is_group && others.len() != 1 {
            return Err(ChatError::validation(
                "one-on-one chat must have exactly one other participant",
            ));
        }

        let name = request
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        if request.is_group {
            match &name {
                None => return Err(ChatError::validation("group chat must have a name")),
                Some(name) if name.len() > MAX_CHAT_NAME_LENGTH => {
                    return Err(ChatError::validation(
                        "chat name too long (max 255 characters)",
                    ))
                }
                Some(_) => {}
            }
        }

        let mut member_ids = Vec::with_capacity(others.len() + 1);
        member_ids.push(creator.to_string());
        member_ids.extend(others);

        Ok(NewChat {
            created_by: creator.to_string(),
            name,
            is_group: request.is_group,
            member_ids,
        })
    }

    /// Validate an upload file name
    pub fn file_name(file_name: &str) -> ChatResult<()> {
        if file_name.trim().is_empty() {
            return Err(ChatError::validation("file name cannot be empty"));
        }

        if file_name.len() > MAX_FILE_NAME_LENGTH {
            return Err(ChatError::validation("file name too long (max 255 characters)"));
        }

        Ok(())
    }

    /// Validate a MIME content type such as `image/png`
    pub fn content_type(content_type: &str) -> ChatResult<()> {
        let Some((kind, subtype)) = content_type.split_once('/') else {
            return Err(ChatError::validation("content type must look like type/subtype"));
        };

        if kind.trim().is_empty() || subtype.trim().is_empty() {
            return Err(ChatError::validation("content type must look like type/subtype"));
        }

        Ok(())
    }

    /// Reduce a client-supplied file name to a safe object-name suffix
    pub fn sanitize_file_name(file_name: &str) -> String {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name);

        base.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
