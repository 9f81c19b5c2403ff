use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{Quote, ReadingStatistics, User, UserActivity, UserStats},
    routes::AppState,
    services::{friends, quotes, stats, users},
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// Chart granularity: month, year or all
    #[serde(rename = "type")]
    pub view: String,
    pub period: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = users::create_user(&state.db_pool, &request.username, &request.email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<User>> {
    let user = users::profile(&state.db_pool, &username).await?;
    Ok(Json(user))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserStats>> {
    let stats = stats::profile_stats(&state.db_pool, &username).await?;
    Ok(Json(stats))
}

pub async fn reading_statistics(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<ReadingStatistics>> {
    let statistics = stats::reading_statistics(
        &state.db_pool,
        &username,
        &params.view,
        params.period.as_deref(),
    )
    .await?;
    Ok(Json(statistics))
}

pub async fn activity(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Vec<UserActivity>>> {
    let feed = friends::activity_feed(&state.db_pool, &username).await?;
    Ok(Json(feed))
}

pub async fn quotes(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Vec<Quote>>> {
    let quotes = quotes::quotes_by_user(&state.db_pool, &username).await?;
    Ok(Json(quotes))
}
