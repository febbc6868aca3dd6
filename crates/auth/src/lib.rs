use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use courier_config::AuthConfig;
use rand::RngCore;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

const TOKEN_BYTES: usize = 32;
const MAX_SESSION_TTL_SECONDS: u64 = 10 * 365 * 24 * 3_600;

/// Issues and verifies opaque bearer tokens backed by the `sessions` table
#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

/// The user a token resolves to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let session_ttl =
            Duration::seconds(config.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64);

        Self { pool, session_ttl }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn issue_session(&self, user_id: &str) -> Result<AuthSession, AuthError> {
        self.fetch_user(user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_owned()))?;

        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(timestamp(now))
            .bind(timestamp(expires_at))
            .execute(&self.pool)
            .await?;

        info!(user_id, expires_at = %expires_at, "session issued");

        Ok(AuthSession {
            token,
            user_id: user_id.to_owned(),
            expires_at,
        })
    }

    /// Resolve a bearer token to its user.
    ///
    /// Expired sessions are deleted on first sight.
    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: String = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            self.revoke(token).await?;
            debug!(user_id = %user_id, "expired session removed");
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .fetch_user(&user_id)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    /// Delete a session; `false` when the token was not known
    pub async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn user_profile(&self, user_id: &str) -> Result<User, AuthError> {
        self.fetch_user(user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_owned()))
    }

    async fn fetch_user(&self, id: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query("SELECT id, name, email, avatar_url FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            avatar_url: row.try_get("avatar_url")?,
        }))
    }
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
