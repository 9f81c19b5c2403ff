use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult, middleware::CurrentUser, models::RecommendedBook, routes::AppState,
};

/// Stored recommendations for the caller, freshest scores first
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<RecommendedBook>>> {
    let recommendations = state.engine.fetch(current.user_id).await?;
    Ok(Json(recommendations))
}

/// Regenerates the caller's recommendations on demand, outside the nightly
/// run, and returns the fresh set
pub async fn generate(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<RecommendedBook>>> {
    state.engine.generate(current.user_id).await?;
    let recommendations = state.engine.fetch(current.user_id).await?;
    Ok(Json(recommendations))
}

pub async fn mark_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(recommendation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state
        .engine
        .mark_read(recommendation_id, current.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
