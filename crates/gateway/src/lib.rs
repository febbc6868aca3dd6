//! # Courier Gateway Crate
//!
//! HTTP REST and WebSocket surface for Courier. Resolves callers from
//! session tokens and routes requests to the chat services.
//!
//! ## Architecture
//!
//! - **REST**: users, chats, messages and media upload URLs
//! - **WebSocket**: the live message stream of one chat
//! - **State**: shared services
//! - **Middleware**: authentication, request logging and tracing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use courier_gateway::{create_router, GatewayState};
//!
//! let state = GatewayState::new(authenticator, delivery, chats, media);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use middleware::{auth_middleware, AuthUser};
pub use state::GatewayState;

pub use create_router as build_router;

use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    let authenticated = Router::new()
        .merge(rest::create_rest_routes())
        .merge(websocket::create_websocket_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_health_routes())
        .merge(authenticated)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(middleware::create_trace_layer());

    #[cfg(debug_assertions)]
    {
        router = router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}

#[cfg(debug_assertions)]
#[derive(OpenApi)]
#[openapi(
    paths(
        rest::health::health_check,
        rest::user::me,
        rest::user::search_users,
        rest::chat::list_chats,
        rest::chat::create_chat,
        rest::chat::get_chat,
        rest::message::send_message,
        rest::message::list_messages,
        rest::media::upload_url,
    ),
    components(
        schemas(
            rest::health::HealthResponse,
            rest::user::UsersResponse,
            rest::chat::ChatsResponse,
            rest::message::SendMessageRequest,
            rest::message::MessagesResponse,
            rest::media::UploadUrlRequest,
            courier_chats::Chat,
            courier_chats::ChatDetails,
            courier_chats::ChatSummary,
            courier_chats::ChatMessage,
            courier_chats::CreateChatRequest,
            courier_chats::MediaRef,
            courier_chats::Participant,
            courier_chats::UserProfile,
            courier_chats::UploadTicket,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Users", description = "Profiles and user search"),
        (name = "Chats", description = "Chat management"),
        (name = "Messages", description = "Sending and reading messages"),
        (name = "Media", description = "Upload URLs for attachments"),
    )
)]
struct ApiDoc;
