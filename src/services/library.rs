use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{LibraryEntry, ReadingStatus},
    services::catalog,
    stores::postgres::{LibraryEntryRecord, BOOK_COLUMNS},
};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 10;

/// Everything on the user's shelf, oldest first
pub async fn list_library(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<LibraryEntry>> {
    let sql = format!(
        "SELECT le.id, le.user_id, le.status, le.rating, le.review, le.favorite, \
                le.finished_at, le.created_at, {BOOK_COLUMNS} \
         FROM library_entries le \
         JOIN books b ON b.id = le.book_id \
         WHERE le.user_id = $1 \
         ORDER BY le.created_at ASC, le.id ASC"
    );
    let records = sqlx::query_as::<_, LibraryEntryRecord>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

/// The user's favorited entries, oldest first
pub async fn list_favorites(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<LibraryEntry>> {
    let sql = format!(
        "SELECT le.id, le.user_id, le.status, le.rating, le.review, le.favorite, \
                le.finished_at, le.created_at, {BOOK_COLUMNS} \
         FROM library_entries le \
         JOIN books b ON b.id = le.book_id \
         WHERE le.user_id = $1 AND le.favorite = true \
         ORDER BY le.created_at ASC, le.id ASC"
    );
    let records = sqlx::query_as::<_, LibraryEntryRecord>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

/// Puts a catalog book on the user's shelf with an initial status
pub async fn add_to_library(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
    status: ReadingStatus,
) -> AppResult<LibraryEntry> {
    let book = catalog::require_book(pool, book_id).await?;

    if first_entry(pool, user_id, book_id).await?.is_some() {
        return Err(AppError::Conflict(
            "Book is already in your library".to_string(),
        ));
    }

    let now = Utc::now();
    let finished_at = (status == ReadingStatus::Finished).then_some(now);
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO library_entries \
            (id, user_id, book_id, status, rating, review, favorite, finished_at, created_at) \
         VALUES ($1, $2, $3, $4, NULL, NULL, false, $5, $6)",
    )
    .bind(id)
    .bind(user_id)
    .bind(book_id)
    .bind(status.as_str())
    .bind(finished_at)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(
        user_id = %user_id,
        book_id = %book_id,
        status = status.as_str(),
        "Book added to library"
    );

    Ok(LibraryEntry {
        id,
        user_id,
        book,
        status: Some(status),
        rating: None,
        review: None,
        favorite: false,
        finished_at,
        created_at: now,
    })
}

/// Moves the shelf entry for a book to a new status
///
/// The finish timestamp follows the status: entering Finished stamps it,
/// leaving Finished clears it, staying Finished keeps the original date.
pub async fn update_status(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
    status: ReadingStatus,
) -> AppResult<LibraryEntry> {
    let entry = first_entry(pool, user_id, book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book is not in your library".to_string()))?;

    let finished_at = finished_at_after(entry.status, entry.finished_at, status, Utc::now());
    sqlx::query("UPDATE library_entries SET status = $1, finished_at = $2 WHERE id = $3")
        .bind(status.as_str())
        .bind(finished_at)
        .bind(entry.id)
        .execute(pool)
        .await?;

    Ok(LibraryEntry {
        status: Some(status),
        finished_at,
        ..entry
    })
}

/// Takes a book off the user's shelf
pub async fn remove_from_library(pool: &PgPool, user_id: Uuid, book_id: Uuid) -> AppResult<()> {
    let entry = first_entry(pool, user_id, book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book is not in your library".to_string()))?;

    sqlx::query("DELETE FROM library_entries WHERE id = $1")
        .bind(entry.id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = %user_id, book_id = %book_id, "Book removed from library");
    Ok(())
}

/// Rates a shelved book on the 1 to 10 scale
pub async fn rate_book(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
    rating: i32,
) -> AppResult<LibraryEntry> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }

    let entry = first_entry(pool, user_id, book_id)
        .await?
        .filter(|e| e.status.is_some())
        .ok_or_else(|| {
            AppError::InvalidInput("Add the book to your library before rating it".to_string())
        })?;

    sqlx::query("UPDATE library_entries SET rating = $1 WHERE id = $2")
        .bind(rating)
        .bind(entry.id)
        .execute(pool)
        .await?;

    Ok(LibraryEntry {
        rating: Some(rating),
        ..entry
    })
}

/// Flips the favorite flag, creating a status-less entry when the book is
/// not on the shelf yet
pub async fn toggle_favorite(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
) -> AppResult<LibraryEntry> {
    let book = catalog::require_book(pool, book_id).await?;

    match first_entry(pool, user_id, book_id).await? {
        Some(entry) => {
            let favorite = !entry.favorite;
            sqlx::query("UPDATE library_entries SET favorite = $1 WHERE id = $2")
                .bind(favorite)
                .bind(entry.id)
                .execute(pool)
                .await?;

            Ok(LibraryEntry { favorite, ..entry })
        }
        None => {
            let now = Utc::now();
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO library_entries \
                    (id, user_id, book_id, status, rating, review, favorite, finished_at, created_at) \
                 VALUES ($1, $2, $3, NULL, NULL, NULL, true, NULL, $4)",
            )
            .bind(id)
            .bind(user_id)
            .bind(book_id)
            .bind(now)
            .execute(pool)
            .await?;

            Ok(LibraryEntry {
                id,
                user_id,
                book,
                status: None,
                rating: None,
                review: None,
                favorite: true,
                finished_at: None,
                created_at: now,
            })
        }
    }
}

/// Oldest shelf row for (user, book); duplicates defer to this one
async fn first_entry(
    pool: &PgPool,
    user_id: Uuid,
    book_id: Uuid,
) -> AppResult<Option<LibraryEntry>> {
    let sql = format!(
        "SELECT le.id, le.user_id, le.status, le.rating, le.review, le.favorite, \
                le.finished_at, le.created_at, {BOOK_COLUMNS} \
         FROM library_entries le \
         JOIN books b ON b.id = le.book_id \
         WHERE le.user_id = $1 AND le.book_id = $2 \
         ORDER BY le.created_at ASC, le.id ASC \
         LIMIT 1"
    );
    let record = sqlx::query_as::<_, LibraryEntryRecord>(&sql)
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    Ok(record.map(|r| r.to_domain()))
}

/// Finish timestamp after a status change
fn finished_at_after(
    previous: Option<ReadingStatus>,
    previous_finished_at: Option<DateTime<Utc>>,
    next: ReadingStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (previous, next) {
        // Staying Finished keeps the original completion date
        (Some(ReadingStatus::Finished), ReadingStatus::Finished) => previous_finished_at,
        (_, ReadingStatus::Finished) => Some(now),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).single().unwrap()
    }

    #[test]
    fn test_entering_finished_stamps_now() {
        let now = ts(12);
        assert_eq!(
            finished_at_after(Some(ReadingStatus::Reading), None, ReadingStatus::Finished, now),
            Some(now)
        );
        assert_eq!(
            finished_at_after(None, None, ReadingStatus::Finished, now),
            Some(now)
        );
    }

    #[test]
    fn test_staying_finished_keeps_original_date() {
        let stamped = ts(8);
        assert_eq!(
            finished_at_after(
                Some(ReadingStatus::Finished),
                Some(stamped),
                ReadingStatus::Finished,
                ts(12)
            ),
            Some(stamped)
        );
    }

    #[test]
    fn test_leaving_finished_clears_date() {
        assert_eq!(
            finished_at_after(
                Some(ReadingStatus::Finished),
                Some(ts(8)),
                ReadingStatus::Reading,
                ts(12)
            ),
            None
        );
    }

    #[test]
    fn test_moves_between_unfinished_statuses_stay_unstamped() {
        assert_eq!(
            finished_at_after(
                Some(ReadingStatus::WantToRead),
                None,
                ReadingStatus::Dropped,
                ts(12)
            ),
            None
        );
    }
}
