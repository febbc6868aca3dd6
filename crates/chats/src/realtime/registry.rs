//! In-memory index from chat id to the delivery channels watching it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::{debug, warn};

use crate::entities::ChatMessage;
use crate::types::ChatId;

/// A record as handed to subscribers. Shared, never copied per subscriber.
pub type Delivery = Arc<ChatMessage>;

/// Identity of one outbound channel, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Why a single delivery did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("subscriber channel is closed")]
    Closed,
    #[error("subscriber buffer stayed full past the send timeout")]
    Stalled,
}

/// Sending half of a subscription.
///
/// Clones share the same identity, so registering a clone of an already
/// registered channel does not add a second delivery target.
#[derive(Debug, Clone)]
pub struct DeliveryChannel {
    id: SubscriberId,
    sender: mpsc::Sender<Delivery>,
}

impl DeliveryChannel {
    /// Create a bounded channel and the receiver the subscriber reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let channel = Self {
            id: SubscriberId::next(),
            sender,
        };
        (channel, receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn deliver(&self, message: Delivery, timeout: Duration) -> Result<(), DeliveryError> {
        match self.sender.send_timeout(message, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Closed(_)) => Err(DeliveryError::Closed),
            Err(SendTimeoutError::Timeout(_)) => Err(DeliveryError::Stalled),
        }
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Concurrency-safe map of chat id to its live subscribers.
///
/// Structural changes lock only the shard holding the chat's entry, so
/// unrelated chats do not contend. Entries never stay behind empty.
pub struct BroadcastRegistry {
    entries: DashMap<ChatId, HashMap<SubscriberId, DeliveryChannel>>,
    send_timeout: Duration,
}

impl BroadcastRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            send_timeout,
        }
    }

    /// File `channel` under `chat_id`. Re-registering the same channel is a no-op.
    pub fn register(&self, chat_id: &str, channel: DeliveryChannel) {
        let subscriber = channel.id();
        let mut entry = self.entries.entry(chat_id.to_string()).or_default();
        if entry.insert(subscriber, channel).is_none() {
            debug!(chat_id, %subscriber, watchers = entry.len(), "subscriber registered");
        }
    }

    /// Remove a subscriber, dropping the chat's entry once it is empty.
    ///
    /// Returns whether the subscriber was still registered. Unknown chats or
    /// subscribers are not an error: session cleanup and broadcast pruning
    /// may both try to remove the same channel.
    pub fn unregister(&self, chat_id: &str, subscriber: SubscriberId) -> bool {
        let mut removed = false;
        let emptied = self
            .entries
            .remove_if_mut(chat_id, |_, channels| {
                removed = channels.remove(&subscriber).is_some();
                channels.is_empty()
            })
            .is_some();

        if removed {
            debug!(chat_id, %subscriber, emptied, "subscriber unregistered");
        }
        removed
    }

    /// Deliver `message` to every subscriber of `chat_id`.
    ///
    /// Works on a snapshot taken under the shard lock; the lock is released
    /// before any send. Each send is independent, and every channel that
    /// failed is evicted afterwards through [`Self::unregister`].
    pub async fn broadcast(&self, chat_id: &str, message: Delivery) -> BroadcastReport {
        let snapshot: Vec<DeliveryChannel> = match self.entries.get(chat_id) {
            Some(entry) => entry.values().cloned().collect(),
            None => return BroadcastReport::default(),
        };

        let timeout = self.send_timeout;
        let outcomes = join_all(snapshot.iter().map(|channel| {
            let message = Arc::clone(&message);
            async move { (channel.id(), channel.deliver(message, timeout).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (subscriber, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    if self.unregister(chat_id, subscriber) {
                        report.evicted += 1;
                    }
                    match error {
                        DeliveryError::Closed => {
                            debug!(chat_id, %subscriber, "evicted disconnected subscriber")
                        }
                        DeliveryError::Stalled => {
                            warn!(chat_id, %subscriber, "evicted stalled subscriber")
                        }
                    }
                }
            }
        }
        report
    }

    /// Drop every entry. Receivers observe the end of their stream once
    /// in-flight broadcasts finish.
    pub fn close_all(&self) -> usize {
        let chats = self.entries.len();
        self.entries.clear();
        chats
    }

    /// Number of chats with at least one subscriber
    pub fn conversation_count(&self) -> usize {
        self.entries.len()
    }

    pub fn subscriber_count(&self, chat_id: &str) -> usize {
        self.entries.get(chat_id).map_or(0, |entry| entry.len())
    }

    pub fn is_watched(&self, chat_id: &str) -> bool {
        self.entries.contains_key(chat_id)
    }
}

impl fmt::Debug for BroadcastRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastRegistry")
            .field("conversations", &self.entries.len())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}
