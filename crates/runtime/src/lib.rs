use std::sync::Arc;

use anyhow::{Context, Result};
use courier_auth::Authenticator;
use courier_chats::{ChatService, DeliveryService, MediaService};
use courier_config::AppConfig;
use courier_database::{initialize_database, ChatRepository, MemberRepository, MessageRepository};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`)
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Every long-lived service the server needs, wired to one database pool
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub delivery: Arc<DeliveryService>,
    pub chats: Arc<ChatService>,
    pub media: Arc<MediaService>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let members = Arc::new(MemberRepository::new(db_pool.clone()));
        let messages = Arc::new(MessageRepository::new(db_pool.clone()));
        let directory = Arc::new(ChatRepository::new(db_pool.clone()));

        let delivery = Arc::new(DeliveryService::new(
            members.clone(),
            messages,
            &config.delivery,
        ));
        let chats = Arc::new(ChatService::new(directory, members));
        let media = Arc::new(MediaService::new(&config.media));
        let authenticator = Authenticator::new(db_pool.clone(), &config.auth);

        info!(
            channel_capacity = config.delivery.channel_capacity,
            send_timeout_ms = config.delivery.send_timeout_ms,
            "delivery pipeline ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            delivery,
            chats,
            media,
        })
    }

    /// End every live subscription session
    pub fn close_subscriptions(&self) -> usize {
        let closed = self.delivery.registry().close_all();
        info!(chats = closed, "live subscriptions closed");
        closed
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
