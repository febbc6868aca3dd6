use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_chats::CreateChatRequest;
use courier_config::load as load_config;
use courier_database::{UpsertUser, UserRepository};
use courier_gateway::{build_router, websocket::drain_streams, GatewayState};
use courier_runtime::{telemetry, BackendServices};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

const STREAM_DRAIN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "courier-server")]
#[command(about = "Courier chat backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Seed the database with demo users and chats
    SeedData,
    /// Print a bearer token for a user
    IssueToken {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedData => seed_data().await,
        Commands::IssueToken { user } => issue_token(&user).await,
    }
}

async fn initialise() -> anyhow::Result<(courier_config::AppConfig, BackendServices)> {
    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    Ok((config, services))
}

fn gateway_state(services: &BackendServices) -> GatewayState {
    GatewayState::new(
        services.authenticator.clone(),
        services.delivery.clone(),
        services.chats.clone(),
        services.media.clone(),
    )
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Courier backend");

    let (config, services) = initialise().await?;
    let state = gateway_state(&services);
    let streams = state.stream_tasks();
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    // Live streams would hold graceful shutdown open; end them once the signal arrives.
    let shutdown = {
        let services = services.clone();
        async move {
            courier_runtime::shutdown_signal().await;
            services.close_subscriptions();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server error")?;

    drain_streams(&streams, STREAM_DRAIN_GRACE).await;
    services.db_pool.close().await;
    info!("backend shut down");
    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    info!("seeding database with demo data");

    let (_config, services) = initialise().await?;
    let users = UserRepository::new(services.db_pool.clone());

    for (id, name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        users
            .upsert(&UpsertUser {
                id: id.to_string(),
                name: name.to_string(),
                email: Some(format!("{id}@example.com")),
                avatar_url: None,
            })
            .await
            .with_context(|| format!("failed to seed user {id}"))?;
        println!("user {id}");
    }

    let chat = services
        .chats
        .create_chat(
            "alice",
            CreateChatRequest {
                participant_ids: vec!["bob".to_string()],
                is_group: false,
                name: None,
            },
        )
        .await
        .context("failed to seed direct chat")?;
    println!("direct chat {} (alice, bob)", chat.id);

    info!("seed data inserted");
    Ok(())
}

async fn issue_token(user_id: &str) -> anyhow::Result<()> {
    let (_config, services) = initialise().await?;

    let session = services
        .authenticator
        .issue_session(user_id)
        .await
        .with_context(|| format!("failed to issue a token for {user_id}"))?;

    info!(user_id, expires_at = %session.expires_at, "token issued");
    println!("{}", session.token);
    Ok(())
}
