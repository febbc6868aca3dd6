//! Chat REST endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use courier_chats::{ChatDetails, ChatSummary, CreateChatRequest};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::GatewayResult;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatsResponse {
    pub chats: Vec<ChatSummary>,
}

pub fn create_chat_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/chat", get(list_chats).post(create_chat))
        .route("/chat/:chat_id", get(get_chat))
}

#[utoipa::path(
    get,
    path = "/chat",
    tag = "Chats",
    responses(
        (status = 200, description = "The caller's chats, most recently active first", body = ChatsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_chats(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
) -> GatewayResult<Json<ChatsResponse>> {
    let chats = state.chats.list_chats(&user.id).await?;
    Ok(Json(ChatsResponse { chats }))
}

#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chats",
    request_body = CreateChatRequest,
    responses(
        (status = 201, description = "Chat created, or the existing direct chat", body = Chat),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown participant", body = ErrorResponse)
    )
)]
pub async fn create_chat(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Json(payload): Json<CreateChatRequest>,
) -> GatewayResult<impl IntoResponse> {
    let chat = state.chats.create_chat(&user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

#[utoipa::path(
    get,
    path = "/chat/{chat_id}",
    tag = "Chats",
    params(
        ("chat_id" = String, Path, description = "Chat ID")
    ),
    responses(
        (status = 200, description = "Chat with its participants", body = ChatDetails),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Chat not found", body = ErrorResponse)
    )
)]
pub async fn get_chat(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> GatewayResult<Json<ChatDetails>> {
    let details = state.chats.get_chat(&user.id, &chat_id).await?;
    Ok(Json(details))
}
