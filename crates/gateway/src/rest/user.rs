//! User REST endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use courier_chats::UserProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayResult;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchUsersQuery {
    /// Substring of a name or email
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

pub fn create_user_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/user/me", get(me))
        .route("/user/search", get(search_users))
}

#[utoipa::path(
    get,
    path = "/user/me",
    tag = "Users",
    responses(
        (status = 200, description = "The caller's profile", body = UserProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
) -> GatewayResult<Json<UserProfile>> {
    let profile = state.chats.profile(&user.id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/user/search",
    tag = "Users",
    params(SearchUsersQuery),
    responses(
        (status = 200, description = "Matching users", body = UsersResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn search_users(
    State(state): State<Arc<GatewayState>>,
    _user: AuthUser,
    Query(params): Query<SearchUsersQuery>,
) -> GatewayResult<Json<UsersResponse>> {
    let users = state.chats.search_users(&params.query).await?;
    Ok(Json(UsersResponse { users }))
}
