//! REST API endpoints for the gateway

pub mod chat;
pub mod health;
pub mod media;
pub mod message;
pub mod user;

use axum::Router;
use std::sync::Arc;

use crate::state::GatewayState;

/// Routes that require an authenticated caller
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(user::create_user_routes())
        .merge(chat::create_chat_routes())
        .merge(message::create_message_routes())
        .merge(media::create_media_routes())
}

pub use chat::*;
pub use health::*;
pub use media::*;
pub use message::*;
pub use user::*;
