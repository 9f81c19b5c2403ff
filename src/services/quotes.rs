use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ActivityKind, Quote},
    services::{catalog, catalog::clean_optional, friends::record_activity, users},
    stores::postgres::QuoteRecord,
};

const QUOTE_COLUMNS: &str =
    "q.id, q.book_id, q.user_id, u.username, q.text, q.page, q.chapter, q.created_at";

/// Saves a quote from a book to the user's collection
pub async fn add_quote(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
    text: &str,
    page: Option<String>,
    chapter: Option<String>,
) -> AppResult<Quote> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Quote text must not be empty".to_string(),
        ));
    }

    let user = users::require_user(pool, user_id).await?;
    let book = catalog::require_book(pool, book_id).await?;

    let quote = Quote {
        id: Uuid::new_v4(),
        book_id,
        user_id,
        username: user.username,
        text: text.to_string(),
        page: clean_optional(page),
        chapter: clean_optional(chapter),
        created_at: chrono::Utc::now(),
    };
    sqlx::query(
        "INSERT INTO quotes (id, book_id, user_id, text, page, chapter, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(quote.id)
    .bind(quote.book_id)
    .bind(quote.user_id)
    .bind(&quote.text)
    .bind(&quote.page)
    .bind(&quote.chapter)
    .bind(quote.created_at)
    .execute(pool)
    .await?;

    record_activity(
        pool,
        user_id,
        ActivityKind::QuoteAdded,
        format!("Added a quote from \"{}\"", book.title),
    )
    .await?;

    Ok(quote)
}

/// Rewrites a quote; only its author may edit
pub async fn edit_quote(
    pool: &PgPool,
    user_id: Uuid,
    quote_id: Uuid,
    text: &str,
    page: Option<String>,
    chapter: Option<String>,
) -> AppResult<Quote> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput(
            "Quote text must not be empty".to_string(),
        ));
    }

    let quote = find_quote(pool, quote_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote not found".to_string()))?;
    if quote.user_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the author can edit a quote".to_string(),
        ));
    }

    let page = clean_optional(page);
    let chapter = clean_optional(chapter);
    sqlx::query("UPDATE quotes SET text = $1, page = $2, chapter = $3 WHERE id = $4")
        .bind(text)
        .bind(&page)
        .bind(&chapter)
        .bind(quote_id)
        .execute(pool)
        .await?;

    Ok(Quote {
        text: text.to_string(),
        page,
        chapter,
        ..quote
    })
}

/// Deletes a quote; only its author may delete
pub async fn delete_quote(pool: &PgPool, user_id: Uuid, quote_id: Uuid) -> AppResult<()> {
    let quote = find_quote(pool, quote_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote not found".to_string()))?;
    if quote.user_id != user_id {
        return Err(AppError::AccessDenied(
            "Only the author can delete a quote".to_string(),
        ));
    }

    let book = catalog::require_book(pool, quote.book_id).await?;
    sqlx::query("DELETE FROM quotes WHERE id = $1")
        .bind(quote_id)
        .execute(pool)
        .await?;

    record_activity(
        pool,
        user_id,
        ActivityKind::QuoteDeleted,
        format!("Deleted a quote from \"{}\"", book.title),
    )
    .await?;

    Ok(())
}

/// All quotes saved from one book, newest first
pub async fn quotes_for_book(pool: &PgPool, book_id: Uuid) -> AppResult<Vec<Quote>> {
    catalog::require_book(pool, book_id).await?;

    let sql = format!(
        "SELECT {QUOTE_COLUMNS} \
         FROM quotes q JOIN users u ON u.id = q.user_id \
         WHERE q.book_id = $1 \
         ORDER BY q.created_at DESC, q.id ASC"
    );
    let records = sqlx::query_as::<_, QuoteRecord>(&sql)
        .bind(book_id)
        .fetch_all(pool)
        .await?;

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

/// One user's saved quotes across all books, newest first
pub async fn quotes_by_user(pool: &PgPool, username: &str) -> AppResult<Vec<Quote>> {
    let user = users::find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let sql = format!(
        "SELECT {QUOTE_COLUMNS} \
         FROM quotes q JOIN users u ON u.id = q.user_id \
         WHERE q.user_id = $1 \
         ORDER BY q.created_at DESC, q.id ASC"
    );
    let records = sqlx::query_as::<_, QuoteRecord>(&sql)
        .bind(user.id)
        .fetch_all(pool)
        .await?;

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

async fn find_quote(pool: &PgPool, quote_id: Uuid) -> AppResult<Option<Quote>> {
    let sql = format!(
        "SELECT {QUOTE_COLUMNS} \
         FROM quotes q JOIN users u ON u.id = q.user_id \
         WHERE q.id = $1"
    );
    let record = sqlx::query_as::<_, QuoteRecord>(&sql)
        .bind(quote_id)
        .fetch_optional(pool)
        .await?;

    Ok(record.map(|r| r.to_domain()))
}
