use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookDetail, ReadingStatus},
    stores::postgres::BookRecord,
};

/// Lists catalog books, optionally narrowed to one exact genre label
pub async fn list_books(pool: &PgPool, genre: Option<&str>) -> AppResult<Vec<Book>> {
    let records = match genre {
        Some(genre) => {
            sqlx::query_as::<_, BookRecord>(
                "SELECT id, title, author, genre, cover_url, created_at \
                 FROM books WHERE genre = $1 \
                 ORDER BY title ASC, id ASC",
            )
            .bind(genre)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, BookRecord>(
                "SELECT id, title, author, genre, cover_url, created_at \
                 FROM books ORDER BY title ASC, id ASC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

/// Distinct genre labels present in the catalog
pub async fn list_genres(pool: &PgPool) -> AppResult<Vec<String>> {
    let genres = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT genre FROM books \
         WHERE genre IS NOT NULL AND genre <> '' \
         ORDER BY genre ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(genres)
}

/// Case-insensitive substring search over titles and authors
pub async fn search_books(pool: &PgPool, query: &str) -> AppResult<Vec<Book>> {
    let pattern = format!("%{}%", query.trim());
    let records = sqlx::query_as::<_, BookRecord>(
        "SELECT id, title, author, genre, cover_url, created_at \
         FROM books WHERE title ILIKE $1 OR author ILIKE $1 \
         ORDER BY title ASC, id ASC",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

/// Adds a book to the catalog, reusing an existing row on an exact
/// title + author match so shelves of different users share one book
pub async fn create_book(
    pool: &PgPool,
    title: &str,
    author: &str,
    genre: Option<String>,
    cover_url: Option<String>,
) -> AppResult<Book> {
    let title = title.trim();
    let author = author.trim();
    if title.is_empty() || author.is_empty() {
        return Err(AppError::InvalidInput(
            "Title and author must not be empty".to_string(),
        ));
    }

    if let Some(existing) = find_by_title_author(pool, title, author).await? {
        return Ok(existing);
    }

    let book = Book::new(
        title.to_string(),
        author.to_string(),
        clean_optional(genre),
    );
    sqlx::query(
        "INSERT INTO books (id, title, author, genre, cover_url, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(clean_optional(cover_url))
    .bind(book.created_at)
    .execute(pool)
    .await?;

    tracing::info!(book_id = %book.id, title = %book.title, "Book added to catalog");
    Ok(book)
}

/// One book with its reader counts and community rating
pub async fn book_detail(pool: &PgPool, book_id: Uuid) -> AppResult<BookDetail> {
    let book = require_book(pool, book_id).await?;

    let stats = sqlx::query_as::<_, BookStatsRecord>(
        "SELECT \
            COUNT(*) FILTER (WHERE status = $2) AS reading_count, \
            COUNT(*) FILTER (WHERE status = $3) AS finished_count, \
            COUNT(*) FILTER (WHERE status = $4) AS planned_count, \
            COUNT(*) FILTER (WHERE status = $5) AS dropped_count, \
            COUNT(rating) AS total_ratings, \
            AVG(rating)::double precision AS average_rating \
         FROM library_entries WHERE book_id = $1",
    )
    .bind(book_id)
    .bind(ReadingStatus::Reading.as_str())
    .bind(ReadingStatus::Finished.as_str())
    .bind(ReadingStatus::WantToRead.as_str())
    .bind(ReadingStatus::Dropped.as_str())
    .fetch_one(pool)
    .await?;

    Ok(BookDetail {
        book,
        reading_count: stats.reading_count,
        finished_count: stats.finished_count,
        planned_count: stats.planned_count,
        dropped_count: stats.dropped_count,
        average_rating: rounded_average(stats.average_rating),
        total_ratings: stats.total_ratings,
    })
}

/// Fetches a catalog book or fails with NotFound
pub(crate) async fn require_book(pool: &PgPool, book_id: Uuid) -> AppResult<Book> {
    let record = sqlx::query_as::<_, BookRecord>(
        "SELECT id, title, author, genre, cover_url, created_at \
         FROM books WHERE id = $1",
    )
    .bind(book_id)
    .fetch_optional(pool)
    .await?;

    record
        .map(|r| r.to_domain())
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
}

async fn find_by_title_author(
    pool: &PgPool,
    title: &str,
    author: &str,
) -> AppResult<Option<Book>> {
    let record = sqlx::query_as::<_, BookRecord>(
        "SELECT id, title, author, genre, cover_url, created_at \
         FROM books WHERE title = $1 AND author = $2 \
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(title)
    .bind(author)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(|r| r.to_domain()))
}

#[derive(sqlx::FromRow)]
struct BookStatsRecord {
    reading_count: i64,
    finished_count: i64,
    planned_count: i64,
    dropped_count: i64,
    total_ratings: i64,
    average_rating: Option<f64>,
}

/// Trims an optional field, collapsing blank input to None
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Average rating rounded to one decimal place; unrated books read 0.0
fn rounded_average(average: Option<f64>) -> f64 {
    match average {
        Some(avg) => (avg * 10.0).round() / 10.0,
        None => 0.0,
    }
}
