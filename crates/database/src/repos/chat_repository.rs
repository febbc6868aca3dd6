//! Repository for chat data access operations.

use async_trait::async_trait;
use chrono::Utc;
use courier_chats::{
    Chat, ChatDetails, ChatDirectory, ChatResult, ChatSummary, NewChat, Participant, UserProfile,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::{MemberRepository, UserRepository};
use crate::types::{decode_timestamp, encode_timestamp, DatabaseError, DatabaseResult};

const CHAT_COLUMNS: &str = "c.id, c.name, c.is_group, c.avatar_url, c.created_at";

/// Chats, their participants and the user directory behind them
#[derive(Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
    users: UserRepository,
    members: MemberRepository,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn find_by_id(&self, chat_id: &str) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats c WHERE c.id = ?"))
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| map_chat(&row)).transpose()
    }

    /// The oldest one-to-one chat shared by two users
    pub async fn find_direct(&self, user_a: &str, user_b: &str) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats c
             WHERE c.is_group = 0
               AND EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = c.id AND user_id = ?)
               AND EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = c.id AND user_id = ?)
             ORDER BY c.created_at ASC
             LIMIT 1"
        ))
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| map_chat(&row)).transpose()
    }

    /// Insert a chat together with all of its participants
    pub async fn insert(&self, chat: &NewChat) -> DatabaseResult<Chat> {
        let id = cuid2::create_id();
        let now = encode_timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        for member_id in &chat.member_ids {
            let known: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
                .bind(member_id)
                .fetch_one(&mut *tx)
                .await?;
            if known == 0 {
                return Err(DatabaseError::UnknownUser(member_id.clone()));
            }
        }

        sqlx::query(
            "INSERT INTO chats (id, name, is_group, avatar_url, created_by, created_at)
             VALUES (?, ?, ?, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(chat.name.as_deref())
        .bind(chat.is_group)
        .bind(&chat.created_by)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for member_id in &chat.member_ids {
            sqlx::query("INSERT INTO chat_participants (chat_id, user_id, joined_at) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(member_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            chat_id = %id,
            created_by = %chat.created_by,
            members = chat.member_ids.len(),
            is_group = chat.is_group,
            "chat created"
        );

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("chat {id}")))
    }

    /// Chats of a user, most recently active first
    pub async fn summaries_for(&self, user_id: &str) -> DatabaseResult<Vec<ChatSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.is_group, c.avatar_url, c.created_at,
                    lm.content AS last_message, lm.created_at AS last_message_at,
                    ou.id AS other_id, ou.name AS other_name, ou.avatar_url AS other_avatar
             FROM chat_participants cp
             INNER JOIN chats c ON c.id = cp.chat_id
             LEFT JOIN messages lm ON lm.id = (
                 SELECT m.id FROM messages m
                 WHERE m.chat_id = c.id
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT 1
             )
             LEFT JOIN users ou ON c.is_group = 0 AND ou.id = (
                 SELECT p.user_id FROM chat_participants p
                 WHERE p.chat_id = c.id AND p.user_id != cp.user_id
                 LIMIT 1
             )
             WHERE cp.user_id = ?
             ORDER BY lm.created_at IS NULL, lm.created_at DESC, c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_summary).collect()
    }
}

fn map_chat(row: &SqliteRow) -> DatabaseResult<Chat> {
    let created_at: String = row.try_get("created_at")?;

    Ok(Chat {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_group: row.try_get("is_group")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: decode_timestamp(&created_at)?,
    })
}

fn map_summary(row: &SqliteRow) -> DatabaseResult<ChatSummary> {
    let last_message_at: Option<String> = row.try_get("last_message_at")?;
    let other_id: Option<String> = row.try_get("other_id")?;

    let other_user = match other_id {
        Some(id) => Some(Participant {
            id,
            name: row.try_get("other_name")?,
            avatar_url: row.try_get("other_avatar")?,
        }),
        None => None,
    };

    Ok(ChatSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_group: row.try_get("is_group")?,
        avatar_url: row.try_get("avatar_url")?,
        last_message: row.try_get("last_message")?,
        last_message_at: last_message_at.as_deref().map(decode_timestamp).transpose()?,
        other_user,
    })
}

#[async_trait]
impl ChatDirectory for ChatRepository {
    async fn find_direct_chat(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Chat>> {
        Ok(self.find_direct(user_a, user_b).await?)
    }

    async fn create_chat(&self, chat: &NewChat) -> ChatResult<Chat> {
        Ok(self.insert(chat).await?)
    }

    async fn chat_details(&self, chat_id: &str) -> ChatResult<Option<ChatDetails>> {
        let Some(chat) = self.find_by_id(chat_id).await? else {
            return Ok(None);
        };
        let participants = self.members.participants(chat_id).await?;

        Ok(Some(ChatDetails { chat, participants }))
    }

    async fn list_chats(&self, user_id: &str) -> ChatResult<Vec<ChatSummary>> {
        Ok(self.summaries_for(user_id).await?)
    }

    async fn find_user(&self, user_id: &str) -> ChatResult<Option<UserProfile>> {
        Ok(self.users.find_by_id(user_id).await?.map(UserProfile::from))
    }

    async fn search_users(&self, query: &str, limit: u32) -> ChatResult<Vec<UserProfile>> {
        let users = self.users.search(query, limit).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }
}
