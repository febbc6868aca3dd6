//! Courier Database Crate
//!
//! SQLite connection management, embedded migrations and the repositories
//! that back the membership oracle, message store and chat directory.

use courier_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use entities::{UpsertUser, User};
pub use migrations::run_migrations;
pub use repos::{ChatRepository, MemberRepository, MessageRepository, UserRepository};
pub use types::{DatabaseError, DatabaseResult};

/// Open the pool and bring the schema up to date
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub async fn test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 2,
        };
        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }
}
