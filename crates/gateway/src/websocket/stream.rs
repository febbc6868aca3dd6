//! Live message stream for one chat over a WebSocket

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use courier_chats::SubscriptionSession;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use utoipa::IntoParams;

use crate::error::GatewayResult;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamQuery {
    pub chat_id: String,
}

/// Open a subscription and upgrade the connection.
///
/// The subscription is opened before the upgrade, so a non-member gets a
/// plain HTTP 403 and never a socket.
pub async fn message_stream_handler(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Query(params): Query<StreamQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> GatewayResult<Response> {
    let session = state.delivery.subscribe(&user.id, &params.chat_id).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let tasks = state.stream_tasks();
    Ok(ws.on_upgrade(move |socket| tasks.track_future(forward_session(socket, session))))
}

/// Push every delivered record as a JSON text frame until either side ends.
///
/// Inbound text frames are ignored. The session ends on a close frame, a
/// socket error, or when the registry drops it at shutdown.
async fn forward_session(socket: WebSocket, mut session: SubscriptionSession) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            delivery = session.recv() => {
                let Some(message) = delivery else {
                    debug!(chat_id = %session.chat_id(), "subscription ended by server");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };

                let text = match serde_json::to_string(message.as_ref()) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(message_id = %message.id, %error, "failed to encode message");
                        continue;
                    }
                };

                if sender.send(Message::Text(text)).await.is_err() {
                    debug!(user_id = %session.user_id(), "socket write failed");
                    break;
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(error)) => {
                        debug!(user_id = %session.user_id(), %error, "socket read failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.close();
}

/// Stop accepting stream sockets and wait up to `grace` for the open ones to
/// send their close frames. Returns `false` if some were still running.
pub async fn drain_streams(tasks: &TaskTracker, grace: Duration) -> bool {
    tasks.close();
    let open = tasks.len();

    match tokio::time::timeout(grace, tasks.wait()).await {
        Ok(()) => {
            info!(streams = open, "stream sockets drained");
            true
        }
        Err(_) => {
            warn!(remaining = tasks.len(), "stream sockets still open after grace period");
            false
        }
    }
}
