use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Book;

/// Where a book sits in a user's reading life
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    WantToRead,
    Reading,
    Finished,
    Dropped,
}

impl ReadingStatus {
    /// Stable string form used in the database and query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want_to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Finished => "finished",
            ReadingStatus::Dropped => "dropped",
        }
    }

    /// Parses the stable string form; unknown values yield None
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "want_to_read" => Some(ReadingStatus::WantToRead),
            "reading" => Some(ReadingStatus::Reading),
            "finished" => Some(ReadingStatus::Finished),
            "dropped" => Some(ReadingStatus::Dropped),
            _ => None,
        }
    }
}

/// One book on one user's shelf
///
/// Status is optional: favoriting a book creates an entry with no status.
/// Duplicate (user, book) rows are tolerated; the oldest row is the
/// authoritative one for updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book: Book,
    pub status: Option<ReadingStatus>,
    /// Personal rating on a 1 to 10 scale
    pub rating: Option<i32>,
    /// Private shelf note, distinct from the public review threads
    pub review: Option<String>,
    pub favorite: bool,
    /// Set when the entry moves to Finished, cleared when it leaves it
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_status_serialization() {
        let json = serde_json::to_string(&ReadingStatus::WantToRead).unwrap();
        assert_eq!(json, "\"want_to_read\"");

        let parsed: ReadingStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(parsed, ReadingStatus::Finished);
    }

    #[test]
    fn test_reading_status_round_trips_db_form() {
        for status in [
            ReadingStatus::WantToRead,
            ReadingStatus::Reading,
            ReadingStatus::Finished,
            ReadingStatus::Dropped,
        ] {
            assert_eq!(ReadingStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_reading_status_rejects_unknown() {
        assert_eq!(ReadingStatus::from_str("rereading"), None);
    }
}
