use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quote a reader saved from a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    /// Author's username, joined in for display
    pub username: String,
    pub text: String,
    /// Free-form page reference, e.g. "214" or "xii"
    pub page: Option<String>,
    /// Free-form chapter reference
    pub chapter: Option<String>,
    pub created_at: DateTime<Utc>,
}
