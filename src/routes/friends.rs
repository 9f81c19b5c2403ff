use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Friend, FriendRequest, Friendship},
    routes::AppState,
    services::friends,
};

#[derive(Debug, Deserialize)]
pub struct SendFriendRequest {
    pub username: String,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Friend>>> {
    let friends = friends::friends_of(&state.db_pool, current.user_id).await?;
    Ok(Json(friends))
}

pub async fn incoming(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<FriendRequest>>> {
    let requests = friends::incoming_requests(&state.db_pool, current.user_id).await?;
    Ok(Json(requests))
}

pub async fn send(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<SendFriendRequest>,
) -> AppResult<(StatusCode, Json<Friendship>)> {
    let friendship =
        friends::send_request(&state.db_pool, current.user_id, &request.username).await?;
    Ok((StatusCode::CREATED, Json(friendship)))
}

pub async fn accept(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(friendship_id): Path<Uuid>,
) -> AppResult<Json<Friendship>> {
    let friendship =
        friends::accept_request(&state.db_pool, current.user_id, friendship_id).await?;
    Ok(Json(friendship))
}

pub async fn reject(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(friendship_id): Path<Uuid>,
) -> AppResult<Json<Friendship>> {
    let friendship =
        friends::reject_request(&state.db_pool, current.user_id, friendship_id).await?;
    Ok(Json(friendship))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(friendship_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    friends::remove_friend(&state.db_pool, current.user_id, friendship_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_by_username(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    friends::remove_friend_by_username(&state.db_pool, current.user_id, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
