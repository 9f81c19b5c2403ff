use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        ActivityKind, Book, LibraryEntry, Quote, ReadingStatus, Recommendation, RecommendedBook,
        Review, User, UserActivity,
    },
    stores::{LibraryStore, RecommendationStore, UserDirectory},
};

pub(crate) const BOOK_COLUMNS: &str =
    "b.id AS book_id, b.title AS book_title, b.author AS book_author, \
     b.genre AS book_genre, b.cover_url AS book_cover_url, b.created_at AS book_created_at";

// ============================================================================
// Database record structs
// ============================================================================

#[derive(FromRow)]
pub(crate) struct BookRecord {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookRecord {
    pub(crate) fn to_domain(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            cover_url: self.cover_url,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct LibraryEntryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub favorite: bool,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub book_id: Uuid,
    pub book_title: String,
    pub book_author: String,
    pub book_genre: Option<String>,
    pub book_cover_url: Option<String>,
    pub book_created_at: DateTime<Utc>,
}

impl LibraryEntryRecord {
    pub(crate) fn to_domain(self) -> LibraryEntry {
        LibraryEntry {
            id: self.id,
            user_id: self.user_id,
            // Values this service never wrote read back as status-less
            status: self.status.as_deref().and_then(ReadingStatus::from_str),
            rating: self.rating,
            review: self.review,
            favorite: self.favorite,
            finished_at: self.finished_at,
            created_at: self.created_at,
            book: Book {
                id: self.book_id,
                title: self.book_title,
                author: self.book_author,
                genre: self.book_genre,
                cover_url: self.book_cover_url,
                created_at: self.book_created_at,
            },
        }
    }
}

#[derive(FromRow)]
pub(crate) struct RecommendationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub score: f64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl RecommendationRecord {
    pub(crate) fn to_domain(self) -> Recommendation {
        Recommendation {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            score: self.score,
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct RecommendedBookRecord {
    pub id: Uuid,
    pub score: f64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub book_id: Uuid,
    pub book_title: String,
    pub book_author: String,
    pub book_genre: Option<String>,
    pub book_cover_url: Option<String>,
    pub book_created_at: DateTime<Utc>,
}

impl RecommendedBookRecord {
    pub(crate) fn to_domain(self) -> RecommendedBook {
        RecommendedBook {
            id: self.id,
            score: self.score,
            read: self.read,
            created_at: self.created_at,
            book: Book {
                id: self.book_id,
                title: self.book_title,
                author: self.book_author,
                genre: self.book_genre,
                cover_url: self.book_cover_url,
                created_at: self.book_created_at,
            },
        }
    }
}

#[derive(FromRow)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub(crate) fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct ReviewRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub text: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub(crate) fn to_domain(self) -> Review {
        Review {
            id: self.id,
            book_id: self.book_id,
            user_id: self.user_id,
            username: self.username,
            text: self.text,
            parent_id: self.parent_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct QuoteRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub text: String,
    pub page: Option<String>,
    pub chapter: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QuoteRecord {
    pub(crate) fn to_domain(self) -> Quote {
        Quote {
            id: self.id,
            book_id: self.book_id,
            user_id: self.user_id,
            username: self.username,
            text: self.text,
            page: self.page,
            chapter: self.chapter,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct ActivityRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub(crate) fn to_domain(self) -> Option<UserActivity> {
        let kind = ActivityKind::from_str(&self.kind)?;
        Some(UserActivity {
            id: self.id,
            user_id: self.user_id,
            kind,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

// ============================================================================
// PgLibraryStore
// ============================================================================

/// Library and catalog reads backed by Postgres
#[derive(Clone)]
pub struct PgLibraryStore {
    pool: PgPool,
}

impl PgLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryStore for PgLibraryStore {
    async fn finished_by_user(&self, user_id: Uuid) -> AppResult<Vec<LibraryEntry>> {
        let sql = format!(
            "SELECT le.id, le.user_id, le.status, le.rating, le.review, le.favorite, \
                    le.finished_at, le.created_at, {BOOK_COLUMNS} \
             FROM library_entries le \
             JOIN books b ON b.id = le.book_id \
             WHERE le.user_id = $1 AND le.status = $2 \
             ORDER BY le.created_at ASC, le.id ASC"
        );
        let records = sqlx::query_as::<_, LibraryEntryRecord>(&sql)
            .bind(user_id)
            .bind(ReadingStatus::Finished.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn all_by_user(&self, user_id: Uuid) -> AppResult<Vec<LibraryEntry>> {
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
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn books_by_genre(&self, genre: &str) -> AppResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, author, genre, cover_url, created_at \
             FROM books WHERE genre = $1 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(genre)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<i32>> {
        let ratings = sqlx::query_scalar::<_, i32>(
            "SELECT rating FROM library_entries \
             WHERE book_id = $1 AND rating IS NOT NULL",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }
}

// ============================================================================
// PgRecommendationStore
// ============================================================================

/// Recommendation rows backed by Postgres
#[derive(Clone)]
pub struct PgRecommendationStore {
    pool: PgPool,
}

impl PgRecommendationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_all(&self, recommendations: &[Recommendation]) -> AppResult<()> {
        for rec in recommendations {
            sqlx::query(
                "INSERT INTO recommendations (id, user_id, book_id, score, read, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(rec.id)
            .bind(rec.user_id)
            .bind(rec.book_id)
            .bind(rec.score)
            .bind(rec.read)
            .bind(rec.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Delete and insert run in one transaction so a concurrent reader sees
    /// either the old set or the new one, and a failed insert rolls the
    /// delete back.
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        recommendations: &[Recommendation],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for rec in recommendations {
            sqlx::query(
                "INSERT INTO recommendations (id, user_id, book_id, score, read, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(rec.id)
            .bind(rec.user_id)
            .bind(rec.book_id)
            .bind(rec.score)
            .bind(rec.read)
            .bind(rec.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<RecommendedBook>> {
        let sql = format!(
            "SELECT r.id, r.score, r.read, r.created_at, {BOOK_COLUMNS} \
             FROM recommendations r \
             JOIN books b ON b.id = r.book_id \
             WHERE r.user_id = $1 \
             ORDER BY r.score DESC, r.created_at ASC"
        );
        let records = sqlx::query_as::<_, RecommendedBookRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Recommendation>> {
        let record = sqlx::query_as::<_, RecommendationRecord>(
            "SELECT id, user_id, book_id, score, read, created_at \
             FROM recommendations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE recommendations SET read = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// PgUserDirectory
// ============================================================================

/// User lookups backed by Postgres
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn all_users(&self) -> AppResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, created_at FROM users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| r.to_domain()))
    }
}
