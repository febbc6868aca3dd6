//! Message REST endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use courier_chats::{ChatMessage, MediaRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayResult;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

impl SendMessageRequest {
    fn media(&self) -> Option<MediaRef> {
        self.media_url.as_ref().map(|url| MediaRef {
            url: url.clone(),
            kind: self.media_type.clone(),
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesQuery {
    pub chat_id: String,
    /// Page size, capped by the server
    pub limit: Option<u32>,
    /// Only return messages older than this message
    pub before: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/message", get(list_messages).post(send_message))
}

#[utoipa::path(
    post,
    path = "/message",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and delivered to live viewers", body = ChatMessage),
        (status = 400, description = "Neither content nor media", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 500, description = "Message could not be stored", body = ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Json(payload): Json<SendMessageRequest>,
) -> GatewayResult<impl IntoResponse> {
    let media = payload.media();
    let message = state
        .delivery
        .send(&user.id, &payload.chat_id, payload.content, media)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/message",
    tag = "Messages",
    params(ListMessagesQuery),
    responses(
        (status = 200, description = "Messages, newest first", body = MessagesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Query(params): Query<ListMessagesQuery>,
) -> GatewayResult<Json<MessagesResponse>> {
    let messages = state
        .delivery
        .history(
            &user.id,
            &params.chat_id,
            params.limit,
            params.before.as_deref().filter(|id| !id.is_empty()),
        )
        .await?;

    Ok(Json(MessagesResponse { messages }))
}
