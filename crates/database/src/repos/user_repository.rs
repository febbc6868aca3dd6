//! User repository for database operations.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::entities::{UpsertUser, User};
use crate::types::{decode_timestamp, encode_timestamp, DatabaseResult};

const USER_COLUMNS: &str = "id, name, email, avatar_url, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user, or refresh name, email and avatar when the id exists
    pub async fn upsert(&self, user: &UpsertUser) -> DatabaseResult<User> {
        let now = encode_timestamp(Utc::now());

        sqlx::query(
            "INSERT INTO users (id, name, email, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user.id, "user upserted");

        self.find_by_id(&user.id)
            .await?
            .ok_or_else(|| crate::DatabaseError::NotFound(format!("user {}", user.id)))
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| map_user(&row)).transpose()
    }

    /// Users whose name or email contains `query`, ignoring ASCII case
    pub async fn search(&self, query: &str, limit: u32) -> DatabaseResult<Vec<User>> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\'
             ORDER BY name ASC, id ASC
             LIMIT ?"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }
}

pub(crate) fn map_user(row: &SqliteRow) -> DatabaseResult<User> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    fn alice() -> UpsertUser {
        UpsertUser {
            id: "alice".to_string(),
            name: "Alice Liddell".to_string(),
            email: Some("alice@example.com".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);

        let created = repo.upsert(&alice()).await.unwrap();
        assert_eq!(created.name, "Alice Liddell");

        let mut renamed = alice();
        renamed.name = "Alice".to_string();
        renamed.avatar_url = Some("https://cdn.example.com/a.png".to_string());
        let updated = repo.upsert(&renamed).await.unwrap();

        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);

        assert!(repo.find_by_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_name_or_email_case_insensitively() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);
        repo.upsert(&alice()).await.unwrap();
        repo.upsert(&UpsertUser {
            id: "bob".to_string(),
            name: "Bob".to_string(),
            email: Some("builder@example.com".to_string()),
            avatar_url: None,
        })
        .await
        .unwrap();

        let by_name = repo.search("LIDDELL", 20).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "alice");

        let by_email = repo.search("builder@", 20).await.unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, "bob");

        assert_eq!(repo.search("example", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);
        repo.upsert(&alice()).await.unwrap();

        assert!(repo.search("%", 20).await.unwrap().is_empty());
        assert!(repo.search("_", 20).await.unwrap().is_empty());
    }
}
