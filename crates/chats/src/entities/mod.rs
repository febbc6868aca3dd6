//! Domain entities for the chat system.

pub mod chat;
pub mod message;

pub use chat::{Chat, ChatDetails, ChatSummary, CreateChatRequest, NewChat, Participant, UserProfile};
pub use message::{ChatMessage, MediaRef, NewMessage};
