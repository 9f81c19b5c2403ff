use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A book in the shared catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Unique identifier for the book
    pub id: Uuid,
    pub title: String,
    pub author: String,
    /// Genre label, free-form; empty and missing are treated the same
    pub genre: Option<String>,
    /// Reference to a cover image, stored and served elsewhere
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Creates a new catalog book
    pub fn new(title: String, author: String, genre: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            author,
            genre,
            cover_url: None,
            created_at: Utc::now(),
        }
    }
}

/// Book detail view with aggregated reader data
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub reading_count: i64,
    pub finished_count: i64,
    pub planned_count: i64,
    pub dropped_count: i64,
    /// Average of all user ratings, rounded to one decimal; 0.0 when unrated
    pub average_rating: f64,
    pub total_ratings: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book() {
        let book = Book::new(
            "The Hobbit".to_string(),
            "J.R.R. Tolkien".to_string(),
            Some("Fantasy".to_string()),
        );
        assert_eq!(book.title, "The Hobbit");
        assert_eq!(book.author, "J.R.R. Tolkien");
        assert_eq!(book.genre.as_deref(), Some("Fantasy"));
        assert!(book.cover_url.is_none());
    }
}
