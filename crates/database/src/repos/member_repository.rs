//! Chat participation lookups.

use async_trait::async_trait;
use courier_chats::{ChatResult, MembershipOracle, Participant};
use sqlx::{Row, SqlitePool};

use crate::types::DatabaseResult;

#[derive(Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, user_id: &str, chat_id: &str) -> DatabaseResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = ? AND user_id = ?)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found != 0)
    }

    /// Participants of a chat in join order
    pub async fn participants(&self, chat_id: &str) -> DatabaseResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.avatar_url
             FROM chat_participants cp
             INNER JOIN users u ON u.id = cp.user_id
             WHERE cp.chat_id = ?
             ORDER BY cp.joined_at ASC, cp.rowid ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DatabaseResult<Participant> {
                Ok(Participant {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    avatar_url: row.try_get("avatar_url")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MembershipOracle for MemberRepository {
    async fn is_member(&self, user_id: &str, chat_id: &str) -> ChatResult<bool> {
        Ok(self.exists(user_id, chat_id).await?)
    }
}
