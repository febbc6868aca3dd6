//! # Courier Chats Crate
//!
//! Chat domain model and the real-time message delivery core.
//!
//! ## Architecture
//!
//! - **Entities**: domain models (chats, messages, users)
//! - **Repositories**: traits for the membership oracle, message store and chat directory
//! - **Realtime**: the broadcast registry and subscription sessions
//! - **Services**: delivery pipeline (send/subscribe/history), chat and media services
//! - **Utils**: validation rules
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_chats::DeliveryService;
//!
//! let delivery = DeliveryService::new(membership, store, &config.delivery);
//! let mut session = delivery.subscribe("bob", "c1").await?;
//! delivery.send("alice", "c1", Some("hi".into()), None).await?;
//! let message = session.recv().await;
//! ```

pub mod entities;
pub mod realtime;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

pub use entities::{
    Chat, ChatDetails, ChatMessage, ChatSummary, CreateChatRequest, MediaRef, NewChat, NewMessage,
    Participant, UserProfile,
};
pub use realtime::{BroadcastRegistry, BroadcastReport, SessionState, SubscriptionSession};
pub use repositories::{ChatDirectory, MembershipOracle, MessageStore};
pub use services::{ChatService, DeliveryService, MediaService, UploadTicket};
pub use types::{ChatError, ChatId, ChatResult, MessageId, UserId};
