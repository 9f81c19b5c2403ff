//! Persistence seams for the recommendation engine and scheduler
//!
//! The engine only ever talks to these traits, so its scoring and filtering
//! logic can be exercised against mocks and in-memory doubles. The Postgres
//! implementations live in `postgres`.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, LibraryEntry, Recommendation, RecommendedBook, User},
};

pub mod postgres;

pub use postgres::{PgLibraryStore, PgRecommendationStore, PgUserDirectory};

/// Read access to user libraries and the catalog, as the engine sees them
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryStore: Send + Sync {
    /// Entries the user has finished, oldest first, books embedded
    async fn finished_by_user(&self, user_id: Uuid) -> AppResult<Vec<LibraryEntry>>;

    /// Every entry on the user's shelf, any status or none
    async fn all_by_user(&self, user_id: Uuid) -> AppResult<Vec<LibraryEntry>>;

    /// Catalog books carrying exactly this genre label
    async fn books_by_genre(&self, genre: &str) -> AppResult<Vec<Book>>;

    /// All ratings any user has given a book; unrated entries are absent
    async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<i32>>;
}

/// Storage for generated recommendations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<()>;

    async fn save_all(&self, recommendations: &[Recommendation]) -> AppResult<()>;

    /// Replaces the user's stored set with a new one
    ///
    /// Default implementation deletes then saves. Implementations that can
    /// run both steps in one transaction should override it so a reader never
    /// observes the gap between the two, and a failed save never costs the
    /// previous set.
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        recommendations: &[Recommendation],
    ) -> AppResult<()> {
        self.delete_all_for_user(user_id).await?;
        self.save_all(recommendations).await
    }

    /// Stored recommendations for a user, highest score first, books embedded
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<RecommendedBook>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Recommendation>>;

    /// Flips the read flag on; the row keeps its score and position
    async fn mark_read(&self, id: Uuid) -> AppResult<()>;
}

/// Lookup surface for registered users
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Every registered user, in registration order
    async fn all_users(&self) -> AppResult<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
}
