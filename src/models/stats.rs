use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile summary counters for one user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub books_read: i64,
    pub reading_books: i64,
    pub planned_books: i64,
    pub dropped_books: i64,
    /// All library entries, including status-less favorite rows
    pub total_books: i64,
    /// Finished-book count per genre
    pub top_genres: HashMap<String, i64>,
    pub max_genre_count: i64,
    pub friends_count: i64,
    pub comments_count: i64,
}

impl UserStats {
    /// Bumps the finished count for a genre, tracking the running maximum
    pub fn increment_genre(&mut self, genre: &str) {
        let count = self.top_genres.entry(genre.to_string()).or_insert(0);
        *count += 1;
        if *count > self.max_genre_count {
            self.max_genre_count = *count;
        }
    }
}

/// One point on the reading chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadCount {
    pub label: String,
    pub count: i64,
}

/// Finished-book count for one genre within the selected window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreCount {
    pub genre: String,
    pub count: i64,
}

/// Chart payload for the reading-statistics endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingStatistics {
    pub read_stats: Vec<ReadCount>,
    pub genre_stats: Vec<GenreCount>,
}
