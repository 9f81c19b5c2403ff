use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_request_span, request_id_middleware},
    services::RecommendationEngine,
};

pub mod books;
pub mod friends;
pub mod library;
pub mod recommendations;
pub mod users;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub engine: Arc<RecommendationEngine>,
}

/// Creates the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/books", get(books::list).post(books::create))
        .route("/books/search", get(books::search))
        .route("/books/genres", get(books::genres))
        .route("/books/:id", get(books::detail))
        .route(
            "/books/:id/reviews",
            get(books::list_reviews).post(books::add_review),
        )
        .route(
            "/books/:id/quotes",
            get(books::list_quotes).post(books::add_quote),
        )
        .route(
            "/reviews/:id",
            put(books::edit_review).delete(books::delete_review),
        )
        .route(
            "/quotes/:id",
            put(books::edit_quote).delete(books::delete_quote),
        )
        // Library
        .route("/library", get(library::list).post(library::add))
        .route("/library/favorites", get(library::favorites))
        .route("/library/:book_id", delete(library::remove))
        .route("/library/:book_id/status", put(library::update_status))
        .route("/library/:book_id/rating", put(library::rate))
        .route("/library/:book_id/favorite", post(library::toggle_favorite))
        // Recommendations
        .route("/recommendations", get(recommendations::list))
        .route("/recommendations/generate", post(recommendations::generate))
        .route("/recommendations/:id/read", post(recommendations::mark_read))
        // Friends
        .route("/friends", get(friends::list))
        .route(
            "/friends/requests",
            get(friends::incoming).post(friends::send),
        )
        .route("/friends/requests/:id/accept", post(friends::accept))
        .route("/friends/requests/:id/reject", post(friends::reject))
        .route("/friends/:id", delete(friends::remove))
        .route(
            "/friends/by-username/:username",
            delete(friends::remove_by_username),
        )
        // Users
        .route("/users", post(users::create))
        .route("/users/:username", get(users::profile))
        .route("/users/:username/stats", get(users::stats))
        .route(
            "/users/:username/reading-statistics",
            get(users::reading_statistics),
        )
        .route("/users/:username/activity", get(users::activity))
        .route("/users/:username/quotes", get(users::quotes))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
