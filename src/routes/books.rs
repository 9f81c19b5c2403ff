use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Book, BookDetail, Quote, Review, ReviewSort, ReviewThread},
    routes::AppState,
    services::{catalog, quotes, reviews},
};

#[derive(Debug, Deserialize)]
pub struct ListBooksParams {
    pub genre: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListParams {
    pub sort: Option<ReviewSort>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddReviewRequest {
    pub text: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditReviewRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AddQuoteRequest {
    pub text: String,
    pub page: Option<String>,
    pub chapter: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListBooksParams>,
) -> AppResult<Json<Vec<Book>>> {
    let books = catalog::list_books(&state.db_pool, params.genre.as_deref()).await?;
    Ok(Json(books))
}

pub async fn create(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = catalog::create_book(
        &state.db_pool,
        &request.title,
        &request.author,
        request.genre,
        request.cover_url,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Book>>> {
    let books = catalog::search_books(&state.db_pool, &params.q).await?;
    Ok(Json(books))
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let genres = catalog::list_genres(&state.db_pool).await?;
    Ok(Json(genres))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<BookDetail>> {
    let detail = catalog::book_detail(&state.db_pool, book_id).await?;
    Ok(Json(detail))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Query(params): Query<ReviewListParams>,
) -> AppResult<Json<Vec<ReviewThread>>> {
    let sort = params.sort.unwrap_or_default();
    let threads = reviews::threads_for_book(&state.db_pool, book_id, sort).await?;
    Ok(Json(threads))
}

pub async fn add_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
    Json(request): Json<AddReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = reviews::add_review(
        &state.db_pool,
        current.user_id,
        book_id,
        &request.text,
        request.parent_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn edit_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(review_id): Path<Uuid>,
    Json(request): Json<EditReviewRequest>,
) -> AppResult<Json<Review>> {
    let review =
        reviews::edit_review(&state.db_pool, current.user_id, review_id, &request.text).await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(review_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    reviews::delete_review(&state.db_pool, current.user_id, review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Quote>>> {
    let quotes = quotes::quotes_for_book(&state.db_pool, book_id).await?;
    Ok(Json(quotes))
}

pub async fn add_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(book_id): Path<Uuid>,
    Json(request): Json<AddQuoteRequest>,
) -> AppResult<(StatusCode, Json<Quote>)> {
    let quote = quotes::add_quote(
        &state.db_pool,
        current.user_id,
        book_id,
        &request.text,
        request.page,
        request.chapter,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn edit_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(request): Json<AddQuoteRequest>,
) -> AppResult<Json<Quote>> {
    let quote = quotes::edit_quote(
        &state.db_pool,
        current.user_id,
        quote_id,
        &request.text,
        request.page,
        request.chapter,
    )
    .await?;
    Ok(Json(quote))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(quote_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    quotes::delete_quote(&state.db_pool, current.user_id, quote_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
