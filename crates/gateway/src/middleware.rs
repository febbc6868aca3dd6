//! Authentication and request logging middleware

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, Level};
use utoipa::ToSchema;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// The caller resolved from a session token
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<courier_auth::User> for AuthUser {
    fn from(user: courier_auth::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| GatewayError::AuthenticationFailed("User not authenticated".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Read a bearer token from the `Authorization` header, falling back to a
/// `token` query parameter for WebSocket clients.
pub(crate) fn extract_token(request: &Request) -> Option<String> {
    let header_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned);

    header_token.or_else(|| {
        Query::<TokenQuery>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
    })
}

/// Resolve the session token and attach the caller as an [`AuthUser`]
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = extract_token(&request).ok_or_else(|| {
        GatewayError::AuthenticationFailed("Missing authentication token".to_string())
    })?;

    let (user, _session) = state.authenticator.authenticate(&token).await?;
    debug!(user_id = %user.id, "request authenticated");

    request.extensions_mut().insert(AuthUser::from(user));
    Ok(next.run(request).await)
}

pub fn create_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG))
}

pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_owned();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        path = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
