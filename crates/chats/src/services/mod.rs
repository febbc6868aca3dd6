//! Business logic services for the chat system.
//!
//! Services coordinate between the repository traits, the realtime
//! registry and the validation rules.

pub mod chat_service;
pub mod delivery_service;
pub mod media_service;

pub use chat_service::ChatService;
pub use delivery_service::DeliveryService;
pub use media_service::{MediaService, UploadTicket};
