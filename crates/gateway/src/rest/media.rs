//! Media upload URL endpoint

use axum::{extract::State, routing::post, Json, Router};
use courier_chats::UploadTicket;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::GatewayResult;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadUrlRequest {
    pub filename: String,
    pub content_type: String,
}

pub fn create_media_routes() -> Router<Arc<GatewayState>> {
    Router::new().route("/media/upload-url", post(upload_url))
}

#[utoipa::path(
    post,
    path = "/media/upload-url",
    tag = "Media",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Signed upload URL and the public URL of the object", body = UploadTicket),
        (status = 400, description = "Invalid file name or content type", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn upload_url(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Json(payload): Json<UploadUrlRequest>,
) -> GatewayResult<Json<UploadTicket>> {
    let ticket = state
        .media
        .upload_url(&payload.filename, &payload.content_type)?;
    debug!(user_id = %user.id, public_url = %ticket.public_url, "upload url issued");
    Ok(Json(ticket))
}
