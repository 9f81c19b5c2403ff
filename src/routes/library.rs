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
    models::{LibraryEntry, ReadingStatus},
    routes::AppState,
    services::library,
};

#[derive(Debug, Deserialize)]
pub struct AddLibraryRequest {
    pub book_id: Uuid,
    pub status: ReadingStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReadingStatus,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i32,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<LibraryEntry>>> {
    let entries = library::list_library(&state.db_pool, current.user_id).await?;
    Ok(Json(entries))
}

pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<AddLibraryRequest>,
) -> AppResult<(StatusCode, Json<LibraryEntry>)> {
    let entry = library::add_to_library(
        &state.db_pool,
        current.user_id,
        request.book_id,
        request.status,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<LibraryEntry>> {
    let entry =
        library::update_status(&state.db_pool, current.user_id, book_id, request.status).await?;
    Ok(Json(entry))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    library::remove_from_library(&state.db_pool, current.user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rate(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<LibraryEntry>> {
    let entry = library::rate_book(&state.db_pool, current.user_id, book_id, request.rating).await?;
    Ok(Json(entry))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<LibraryEntry>> {
    let entry = library::toggle_favorite(&state.db_pool, current.user_id, book_id).await?;
    Ok(Json(entry))
}

pub async fn favorites(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<LibraryEntry>>> {
    let entries = library::list_favorites(&state.db_pool, current.user_id).await?;
    Ok(Json(entries))
}
