//! Send, subscribe and history: the message delivery pipeline.

use std::sync::Arc;

use chrono::Utc;
use courier_config::DeliveryConfig;
use tracing::{info, warn};

use crate::entities::{ChatMessage, MediaRef, NewMessage};
use crate::realtime::{BroadcastRegistry, SubscriptionSession};
use crate::repositories::{MembershipOracle, MessageStore};
use crate::types::{ChatError, ChatResult};

/// Validates, authorizes and persists messages, then fans them out to live subscribers.
pub struct DeliveryService {
    membership: Arc<dyn MembershipOracle>,
    store: Arc<dyn MessageStore>,
    registry: Arc<BroadcastRegistry>,
    channel_capacity: usize,
    history_page_size: u32,
}

impl DeliveryService {
    /// Create a service with its own registry
    pub fn new(
        membership: Arc<dyn MembershipOracle>,
        store: Arc<dyn MessageStore>,
        config: &DeliveryConfig,
    ) -> Self {
        let registry = Arc::new(BroadcastRegistry::new(config.send_timeout()));
        Self::with_registry(membership, store, registry, config)
    }

    /// Create a service that broadcasts through an existing registry
    pub fn with_registry(
        membership: Arc<dyn MembershipOracle>,
        store: Arc<dyn MessageStore>,
        registry: Arc<BroadcastRegistry>,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            membership,
            store,
            registry,
            channel_capacity: config.channel_capacity,
            history_page_size: config.history_page_size.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<BroadcastRegistry> {
        &self.registry
    }

    /// Send a message to a chat.
    ///
    /// Nothing is broadcast unless the store committed the record, so a live
    /// subscriber never sees a message a later history read would miss.
    pub async fn send(
        &self,
        sender_id: &str,
        chat_id: &str,
        content: Option<String>,
        media: Option<MediaRef>,
    ) -> ChatResult<ChatMessage> {
        let draft = NewMessage::new(chat_id, sender_id, content, media)?;

        self.ensure_member(sender_id, chat_id).await?;

        let message = self.store.persist(&draft).await.map_err(|error| {
            warn!(chat_id, sender_id, %error, "message persistence failed");
            error
        })?;

        let report = self
            .registry
            .broadcast(&message.chat_id, Arc::new(message.clone()))
            .await;

        info!(
            message_id = %message.id,
            chat_id = %message.chat_id,
            sender_id,
            delivered = report.delivered,
            evicted = report.evicted,
            "message sent"
        );

        Ok(message)
    }

    /// Open a live subscription. Only messages sent after this returns are delivered.
    pub async fn subscribe(&self, user_id: &str, chat_id: &str) -> ChatResult<SubscriptionSession> {
        SubscriptionSession::open(
            self.membership.as_ref(),
            Arc::clone(&self.registry),
            user_id,
            chat_id,
            self.channel_capacity,
        )
        .await
    }

    /// Read message history, newest first.
    ///
    /// `before` names a message; only strictly older messages are returned.
    /// An unknown `before` id reads from the newest message.
    pub async fn history(
        &self,
        user_id: &str,
        chat_id: &str,
        limit: Option<u32>,
        before: Option<&str>,
    ) -> ChatResult<Vec<ChatMessage>> {
        self.ensure_member(user_id, chat_id).await?;

        let limit = limit
            .unwrap_or(self.history_page_size)
            .clamp(1, self.history_page_size);

        let cursor = match before {
            Some(message_id) => Some(
                self.store
                    .created_at(chat_id, message_id)
                    .await?
                    .unwrap_or_else(Utc::now),
            ),
            None => None,
        };

        self.store.history(chat_id, limit, cursor).await
    }

    async fn ensure_member(&self, user_id: &str, chat_id: &str) -> ChatResult<()> {
        if self.membership.is_member(user_id, chat_id).await? {
            Ok(())
        } else {
            warn!(chat_id, user_id, "rejected: not a member");
            Err(ChatError::not_a_member())
        }
    }
}
