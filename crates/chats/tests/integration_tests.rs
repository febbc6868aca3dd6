//! Integration tests for the delivery pipeline against in-memory collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_chats::{
    ChatError, ChatMessage, ChatResult, DeliveryService, MediaRef, MembershipOracle, MessageStore,
    NewMessage, SessionState,
};
use courier_config::DeliveryConfig;
use futures_util::StreamExt;
use tokio::time::timeout;

#[derive(Default)]
struct MemoryMembers {
    members: Mutex<HashSet<(String, String)>>,
}

impl MemoryMembers {
    fn with(pairs: &[(&str, &str)]) -> Self {
        let members = pairs
            .iter()
            .map(|(user, chat)| (user.to_string(), chat.to_string()))
            .collect();
        Self {
            members: Mutex::new(members),
        }
    }

    fn remove(&self, user: &str, chat: &str) {
        self.members
            .lock()
            .unwrap()
            .remove(&(user.to_string(), chat.to_string()));
    }
}

#[async_trait]
impl MembershipOracle for MemoryMembers {
    async fn is_member(&self, user_id: &str, chat_id: &str) -> ChatResult<bool> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .contains(&(user_id.to_string(), chat_id.to_string())))
    }
}

#[derive(Default)]
struct MemoryStore {
    messages: Mutex<Vec<ChatMessage>>,
    next_id: AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn persist(&self, message: &NewMessage) -> ChatResult<ChatMessage> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatError::persistence("store unavailable"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = ChatMessage {
            id: format!("m{id}"),
            chat_id: message.chat_id.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_id.to_uppercase(),
            sender_avatar: None,
            content: message.content.clone(),
            media: message.media.clone(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn history(
        &self,
        chat_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> ChatResult<Vec<ChatMessage>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .rev()
            .filter(|m| m.chat_id == chat_id)
            .filter(|m| before.map_or(true, |cursor| m.created_at < cursor))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn created_at(&self, chat_id: &str, message_id: &str) -> ChatResult<Option<DateTime<Utc>>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .find(|m| m.chat_id == chat_id && m.id == message_id)
            .map(|m| m.created_at))
    }
}

struct Harness {
    members: Arc<MemoryMembers>,
    store: Arc<MemoryStore>,
    delivery: DeliveryService,
}

fn harness(pairs: &[(&str, &str)]) -> Harness {
    let members = Arc::new(MemoryMembers::with(pairs));
    let store = Arc::new(MemoryStore::default());
    let config = DeliveryConfig {
        channel_capacity: 16,
        send_timeout_ms: 50,
        history_page_size: 50,
    };
    let delivery = DeliveryService::new(members.clone(), store.clone(), &config);
    Harness {
        members,
        store,
        delivery,
    }
}

const QUIET: Duration = Duration::from_millis(50);

#[tokio::test]
async fn scenario_member_receives_then_disconnects() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);

    let mut bob = h.delivery.subscribe("bob", "c1").await.unwrap();
    let sent = h
        .delivery
        .send("alice", "c1", Some("hi".to_string()), None)
        .await
        .unwrap();

    let received = bob.recv().await.expect("bob should receive the message");
    assert_eq!(received.content.as_deref(), Some("hi"));
    assert_eq!(received.chat_id, "c1");
    assert_eq!(received.sender_id, "alice");
    assert_eq!(received.id, sent.id);

    drop(bob);

    let second = h
        .delivery
        .send("alice", "c1", Some("anyone?".to_string()), None)
        .await;
    assert!(second.is_ok());
    assert!(!h.delivery.registry().is_watched("c1"));
    assert_eq!(h.delivery.registry().conversation_count(), 0);
    assert_eq!(h.store.count(), 2);
}

#[tokio::test]
async fn scenario_non_member_cannot_subscribe() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);

    let result = h.delivery.subscribe("carol", "c1").await;

    assert!(matches!(result, Err(ChatError::PermissionDenied { .. })));
    assert!(!h.delivery.registry().is_watched("c1"));
}

#[tokio::test]
async fn broadcast_stays_within_its_chat() {
    let h = harness(&[("alice", "c1"), ("bob", "c1"), ("bob", "c2"), ("dave", "c2")]);

    let mut c1_viewer = h.delivery.subscribe("bob", "c1").await.unwrap();
    let mut c2_viewer = h.delivery.subscribe("dave", "c2").await.unwrap();

    h.delivery
        .send("alice", "c1", Some("for c1".to_string()), None)
        .await
        .unwrap();

    assert!(c1_viewer.recv().await.is_some());
    assert!(timeout(QUIET, c2_viewer.recv()).await.is_err());
}

#[tokio::test]
async fn every_subscriber_gets_messages_in_send_order() {
    let h = harness(&[("alice", "c1"), ("bob", "c1"), ("dave", "c1")]);

    let mut viewers = vec![
        h.delivery.subscribe("bob", "c1").await.unwrap(),
        h.delivery.subscribe("dave", "c1").await.unwrap(),
        h.delivery.subscribe("bob", "c1").await.unwrap(),
    ];
    assert_eq!(h.delivery.registry().subscriber_count("c1"), 3);

    for n in 0..5 {
        h.delivery
            .send("alice", "c1", Some(format!("msg {n}")), None)
            .await
            .unwrap();
    }

    for viewer in &mut viewers {
        let contents: Vec<String> = viewer
            .by_ref()
            .take(5)
            .map(|m| m.content.clone().unwrap_or_default())
            .collect()
            .await;
        assert_eq!(contents, (0..5).map(|n| format!("msg {n}")).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn new_subscription_sees_no_backlog() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);

    h.delivery
        .send("alice", "c1", Some("before".to_string()), None)
        .await
        .unwrap();
    let mut bob = h.delivery.subscribe("bob", "c1").await.unwrap();

    assert!(timeout(QUIET, bob.recv()).await.is_err());
}

#[tokio::test]
async fn persistence_failure_is_retryable_and_silent() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);
    let mut bob = h.delivery.subscribe("bob", "c1").await.unwrap();

    h.store.fail_writes(true);
    let err = h
        .delivery
        .send("alice", "c1", Some("lost".to_string()), None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(timeout(QUIET, bob.recv()).await.is_err());

    h.store.fail_writes(false);
    h.delivery
        .send("alice", "c1", Some("retried".to_string()), None)
        .await
        .unwrap();
    assert_eq!(bob.recv().await.unwrap().content.as_deref(), Some("retried"));
}

#[tokio::test]
async fn membership_is_checked_on_every_send() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);
    let _bob = h.delivery.subscribe("bob", "c1").await.unwrap();

    h.delivery
        .send("alice", "c1", Some("first".to_string()), None)
        .await
        .unwrap();

    h.members.remove("alice", "c1");
    let result = h
        .delivery
        .send("alice", "c1", Some("second".to_string()), None)
        .await;

    assert!(matches!(result, Err(ChatError::PermissionDenied { .. })));
    assert_eq!(h.store.count(), 1);
}

#[tokio::test]
async fn removed_member_keeps_streaming_until_disconnect() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);
    let mut bob = h.delivery.subscribe("bob", "c1").await.unwrap();

    h.members.remove("bob", "c1");
    h.delivery
        .send("alice", "c1", Some("still here".to_string()), None)
        .await
        .unwrap();

    assert_eq!(bob.state(), SessionState::Streaming);
    assert!(bob.recv().await.is_some());
}

#[tokio::test]
async fn media_only_message_is_delivered() {
    let h = harness(&[("alice", "c1"), ("bob", "c1")]);
    let mut bob = h.delivery.subscribe("bob", "c1").await.unwrap();

    let media = MediaRef {
        url: "https://cdn.example.com/cat.png".to_string(),
        kind: Some("image/png".to_string()),
    };
    h.delivery
        .send("alice", "c1", None, Some(media.clone()))
        .await
        .unwrap();

    let received = bob.recv().await.unwrap();
    assert!(received.content.is_none());
    assert_eq!(received.media, Some(media));
}

#[tokio::test]
async fn history_pages_backwards_from_a_cursor() {
    let h = harness(&[("alice", "c1")]);
    let mut ids = HashMap::new();
    for n in 0..4 {
        let sent = h
            .delivery
            .send("alice", "c1", Some(format!("msg {n}")), None)
            .await
            .unwrap();
        ids.insert(n, sent.id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let newest = h.delivery.history("alice", "c1", Some(2), None).await.unwrap();
    let contents: Vec<_> = newest.iter().filter_map(|m| m.content.clone()).collect();
    assert_eq!(contents, vec!["msg 3".to_string(), "msg 2".to_string()]);

    let older = h
        .delivery
        .history("alice", "c1", None, Some(ids[&2].as_str()))
        .await
        .unwrap();
    let contents: Vec<_> = older.iter().filter_map(|m| m.content.clone()).collect();
    assert_eq!(contents, vec!["msg 1".to_string(), "msg 0".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn churn_never_leaves_empty_entries() {
    let pairs: Vec<(String, String)> = (0..8)
        .flat_map(|chat| (0..4).map(move |user| (format!("u{user}"), format!("chat{chat}"))))
        .collect();
    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(u, c)| (u.as_str(), c.as_str())).collect();
    let h = Arc::new(harness(&borrowed));

    let mut tasks = Vec::new();
    for chat in 0..8 {
        for user in 0..4 {
            let h = Arc::clone(&h);
            tasks.push(tokio::spawn(async move {
                let chat_id = format!("chat{chat}");
                let user_id = format!("u{user}");
                for round in 0..10 {
                    let session = h.delivery.subscribe(&user_id, &chat_id).await.unwrap();
                    h.delivery
                        .send(&user_id, &chat_id, Some(format!("{user_id}-{round}")), None)
                        .await
                        .unwrap();
                    drop(session);
                }
            }));
        }
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(h.delivery.registry().conversation_count(), 0);
    assert_eq!(h.store.count(), 8 * 4 * 10);
}
