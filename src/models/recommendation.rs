use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Book;

/// A stored recommendation row
///
/// Rows are bulk-deleted and regenerated per user; nothing updates them in
/// place except the read flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub score: f64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Creates a fresh unread recommendation
    pub fn new(user_id: Uuid, book_id: Uuid, score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            score,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// A recommendation as served to the client, with the book embedded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedBook {
    pub id: Uuid,
    pub book: Book,
    pub score: f64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recommendation_starts_unread() {
        let user_id = Uuid::new_v4();
        let book_id = Uuid::new_v4();
        let rec = Recommendation::new(user_id, book_id, 3.6);
        assert_eq!(rec.user_id, user_id);
        assert_eq!(rec.book_id, book_id);
        assert!(!rec.read);
        assert_eq!(rec.score, 3.6);
    }
}
