//! Message persistence and history reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_chats::{ChatMessage, ChatResult, MediaRef, MessageStore, NewMessage};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::types::{decode_timestamp, encode_timestamp, DatabaseError, DatabaseResult};

const HYDRATED_SELECT: &str = "SELECT m.id, m.chat_id, m.sender_id, u.name AS sender_name,
        u.avatar_url AS sender_avatar, m.content, m.media_url, m.media_type, m.created_at
     FROM messages m
     INNER JOIN users u ON u.id = m.sender_id";

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a message and read it back joined with its sender
    pub async fn insert(&self, message: &NewMessage) -> DatabaseResult<ChatMessage> {
        let id = cuid2::create_id();
        let now = encode_timestamp(Utc::now());
        let (media_url, media_type) = match &message.media {
            Some(media) => (Some(media.url.as_str()), media.kind.as_deref()),
            None => (None, None),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, content, media_url, media_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&message.chat_id)
        .bind(&message.sender_id)
        .bind(message.content.as_deref())
        .bind(media_url)
        .bind(media_type)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("{HYDRATED_SELECT} WHERE m.id = ?"))
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("message {id}")))?;
        let stored = map_message(&row)?;

        tx.commit().await?;

        info!(message_id = %stored.id, chat_id = %stored.chat_id, "message stored");
        Ok(stored)
    }

    pub async fn list(
        &self,
        chat_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> DatabaseResult<Vec<ChatMessage>> {
        let cursor = before.map(encode_timestamp);

        let rows = sqlx::query(&format!(
            "{HYDRATED_SELECT}
             WHERE m.chat_id = ? AND (? IS NULL OR m.created_at < ?)
             ORDER BY m.created_at DESC, m.rowid DESC
             LIMIT ?"
        ))
        .bind(chat_id)
        .bind(cursor.as_deref())
        .bind(cursor.as_deref())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        debug!(chat_id, count = rows.len(), "history page read");
        rows.iter().map(map_message).collect()
    }

    pub async fn timestamp_of(
        &self,
        chat_id: &str,
        message_id: &str,
    ) -> DatabaseResult<Option<DateTime<Utc>>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT created_at FROM messages WHERE id = ? AND chat_id = ?")
                .bind(message_id)
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await?;

        raw.as_deref().map(decode_timestamp).transpose()
    }
}

fn map_message(row: &SqliteRow) -> DatabaseResult<ChatMessage> {
    let media_url: Option<String> = row.try_get("media_url")?;
    let media_type: Option<String> = row.try_get("media_type")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_name: row.try_get("sender_name")?,
        sender_avatar: row.try_get("sender_avatar")?,
        content: row.try_get("content")?,
        media: media_url.map(|url| MediaRef {
            url,
            kind: media_type,
        }),
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn persist(&self, message: &NewMessage) -> ChatResult<ChatMessage> {
        Ok(self.insert(message).await?)
    }

    async fn history(
        &self,
        chat_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> ChatResult<Vec<ChatMessage>> {
        Ok(self.list(chat_id, limit, before).await?)
    }

    async fn created_at(&self, chat_id: &str, message_id: &str) -> ChatResult<Option<DateTime<Utc>>> {
        Ok(self.timestamp_of(chat_id, message_id).await?)
    }
}
