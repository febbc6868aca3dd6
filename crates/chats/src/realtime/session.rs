//! Lifecycle of one live connection watching one chat.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::registry::{BroadcastRegistry, Delivery, DeliveryChannel, SubscriberId};
use crate::repositories::MembershipOracle;
use crate::types::{ChatError, ChatId, ChatResult, UserId};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting on the membership check
    Opening,
    /// Member confirmed, channel not yet registered
    Authorized,
    /// Registered and receiving records
    Streaming,
    /// Unregistered; the stream is over
    Closed,
}

/// A viewer's live subscription to one chat.
///
/// The session is registered with the [`BroadcastRegistry`] for exactly as
/// long as it is alive: [`close`](Self::close) or dropping it unregisters the
/// channel, whichever way the owning connection ends. It yields only records
/// broadcast after it reached [`SessionState::Streaming`].
///
/// Membership is checked once, at open. A user removed from the chat keeps
/// receiving records until the session ends.
pub struct SubscriptionSession {
    chat_id: ChatId,
    user_id: UserId,
    subscriber: SubscriberId,
    receiver: mpsc::Receiver<Delivery>,
    registry: Arc<BroadcastRegistry>,
    state: SessionState,
}

impl SubscriptionSession {
    /// Authorize `user_id` for `chat_id` and start streaming.
    ///
    /// A non-member gets [`ChatError::PermissionDenied`] and nothing is registered.
    pub async fn open(
        membership: &dyn MembershipOracle,
        registry: Arc<BroadcastRegistry>,
        user_id: &str,
        chat_id: &str,
        capacity: usize,
    ) -> ChatResult<Self> {
        let mut state = SessionState::Opening;
        debug!(chat_id, user_id, ?state, "opening subscription");

        if !membership.is_member(user_id, chat_id).await? {
            info!(chat_id, user_id, "subscription rejected: not a member");
            return Err(ChatError::not_a_member());
        }
        state = SessionState::Authorized;
        debug!(chat_id, user_id, ?state, "subscription authorized");

        let (channel, receiver) = DeliveryChannel::new(capacity);
        let subscriber = channel.id();
        registry.register(chat_id, channel);
        state = SessionState::Streaming;

        info!(chat_id, user_id, %subscriber, "subscription streaming");

        Ok(Self {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            subscriber,
            receiver,
            registry,
            state,
        })
    }

    /// Next record, or `None` once the session is closed or the registry
    /// dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Delivery> {
        if self.state == SessionState::Closed {
            return None;
        }

        let next = self.receiver.recv().await;
        if next.is_none() {
            self.close();
        }
        next
    }

    /// Unregister and stop receiving. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        self.registry.unregister(&self.chat_id, self.subscriber);
        self.receiver.close();
        self.state = SessionState::Closed;

        info!(
            chat_id = %self.chat_id,
            user_id = %self.user_id,
            subscriber = %self.subscriber,
            "subscription closed"
        );
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber
    }
}

impl Stream for SubscriptionSession {
    type Item = Delivery;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state == SessionState::Closed {
            return Poll::Ready(None);
        }

        match this.receiver.poll_recv(cx) {
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for SubscriptionSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SubscriptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSession")
            .field("chat_id", &self.chat_id)
            .field("user_id", &self.user_id)
            .field("subscriber", &self.subscriber)
            .field("state", &self.state)
            .finish()
    }
}
