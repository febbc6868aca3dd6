//! Shared application state for the gateway

use std::sync::Arc;

use courier_auth::Authenticator;
use courier_chats::{BroadcastRegistry, ChatService, DeliveryService, MediaService};
use tokio_util::task::TaskTracker;

/// Services every handler can reach
#[derive(Clone)]
pub struct GatewayState {
    pub authenticator: Authenticator,
    pub delivery: Arc<DeliveryService>,
    pub chats: Arc<ChatService>,
    pub media: Arc<MediaService>,
    stream_tasks: TaskTracker,
}

impl GatewayState {
    pub fn new(
        authenticator: Authenticator,
        delivery: Arc<DeliveryService>,
        chats: Arc<ChatService>,
        media: Arc<MediaService>,
    ) -> Self {
        Self {
            authenticator,
            delivery,
            chats,
            media,
            stream_tasks: TaskTracker::new(),
        }
    }

    /// Registry of live subscription sessions, used to end them at shutdown
    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        self.delivery.registry()
    }

    /// Tracks the upgraded stream sockets, which outlive their HTTP request.
    ///
    /// Close it and wait on it after the server stops accepting requests so
    /// every socket gets its close frame.
    pub fn stream_tasks(&self) -> TaskTracker {
        self.stream_tasks.clone()
    }
}
