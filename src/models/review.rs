use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A public review on a book's page
///
/// Reviews form one level of threading: a root review has no parent, a reply
/// points at its root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    /// Author's username, joined in for display
    pub username: String,
    pub text: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A root review together with its replies, oldest reply first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewThread {
    pub review: Review,
    pub replies: Vec<Review>,
    pub reply_count: usize,
}

/// Sort order for a book's root reviews
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    New,
    Old,
}
