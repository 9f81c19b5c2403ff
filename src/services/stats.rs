use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        FriendshipStatus, GenreCount, LibraryEntry, ReadCount, ReadingStatistics, ReadingStatus,
        UserStats,
    },
    services::{library, users},
};

/// Time span a reading chart covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatsWindow {
    /// One calendar month, bucketed per day
    Month { year: i32, month: u32 },
    /// One calendar year, bucketed per month
    Year(i32),
    /// Everything, bucketed per year from the earliest finish
    All,
}

/// Profile summary counters shown on a user's page
pub async fn profile_stats(pool: &PgPool, username: &str) -> AppResult<UserStats> {
    let user = users::find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let entries = library::list_library(pool, user.id).await?;
    let mut stats = tally_entries(&entries);

    stats.comments_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(pool)
            .await?;

    stats.friends_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM friendships \
         WHERE status = $2 AND (requester_id = $1 OR receiver_id = $1)",
    )
    .bind(user.id)
    .bind(FriendshipStatus::Accepted.as_str())
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// Chart data for the reading-statistics view
///
/// `view` selects the bucketing: `month` (daily buckets, `period` = YYYY-MM),
/// `year` (monthly buckets, `period` = YYYY) or `all` (yearly buckets,
/// `period` ignored). Buckets come back zero-filled and ascending.
pub async fn reading_statistics(
    pool: &PgPool,
    username: &str,
    view: &str,
    period: Option<&str>,
) -> AppResult<ReadingStatistics> {
    let user = users::find_by_username(pool, username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let window = parse_window(view, period)?;
    let finished = finished_dates(pool, user.id).await?;
    let today = Utc::now().date_naive();

    Ok(ReadingStatistics {
        read_stats: build_read_stats(&window, &finished, today),
        genre_stats: build_genre_stats(&window, &finished),
    })
}

async fn finished_dates(
    pool: &PgPool,
    user_id: Uuid,
) -> AppResult<Vec<(NaiveDate, Option<String>)>> {
    #[derive(sqlx::FromRow)]
    struct FinishedRecord {
        finished_at: DateTime<Utc>,
        genre: Option<String>,
    }

    let records = sqlx::query_as::<_, FinishedRecord>(
        "SELECT le.finished_at, b.genre \
         FROM library_entries le \
         JOIN books b ON b.id = le.book_id \
         WHERE le.user_id = $1 AND le.status = $2 AND le.finished_at IS NOT NULL",
    )
    .bind(user_id)
    .bind(ReadingStatus::Finished.as_str())
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| (r.finished_at.date_naive(), r.genre))
        .collect())
}

/// Folds a shelf into the profile counters; friend and review counts are
/// filled in separately
fn tally_entries(entries: &[LibraryEntry]) -> UserStats {
    let mut stats = UserStats::default();
    for entry in entries {
        stats.total_books += 1;
        match entry.status {
            Some(ReadingStatus::Finished) => {
                stats.books_read += 1;
                if let Some(genre) = entry.book.genre.as_deref() {
                    if !genre.is_empty() {
                        stats.increment_genre(genre);
                    }
                }
            }
            Some(ReadingStatus::Reading) => stats.reading_books += 1,
            Some(ReadingStatus::WantToRead) => stats.planned_books += 1,
            Some(ReadingStatus::Dropped) => stats.dropped_books += 1,
            None => {}
        }
    }
    stats
}

fn parse_window(view: &str, period: Option<&str>) -> AppResult<StatsWindow> {
    match view {
        "month" => {
            let period = period.ok_or_else(|| {
                AppError::InvalidInput("The month view needs a period of the form YYYY-MM".to_string())
            })?;
            let (year, month) = period
                .split_once('-')
                .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                .filter(|&(y, m)| NaiveDate::from_ymd_opt(y, m, 1).is_some())
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("Invalid month period: {period}"))
                })?;
            Ok(StatsWindow::Month { year, month })
        }
        "year" => {
            let period = period.ok_or_else(|| {
                AppError::InvalidInput("The year view needs a period of the form YYYY".to_string())
            })?;
            let year = period
                .parse::<i32>()
                .ok()
                .filter(|&y| NaiveDate::from_ymd_opt(y, 1, 1).is_some())
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid year period: {period}")))?;
            Ok(StatsWindow::Year(year))
        }
        "all" => Ok(StatsWindow::All),
        other => Err(AppError::InvalidInput(format!(
            "Unknown statistics view: {other}"
        ))),
    }
}

fn in_window(window: &StatsWindow, date: NaiveDate) -> bool {
    match *window {
        StatsWindow::Month { year, month } => date.year() == year && date.month() == month,
        StatsWindow::Year(year) => date.year() == year,
        StatsWindow::All => true,
    }
}

fn bucket_label(window: &StatsWindow, date: NaiveDate) -> String {
    match window {
        StatsWindow::Month { .. } => date.format("%-d %B").to_string(),
        StatsWindow::Year(_) => date.format("%B").to_string(),
        StatsWindow::All => date.format("%Y").to_string(),
    }
}

/// Zero-filled ascending buckets for the window, counts from the finish dates
fn build_read_stats(
    window: &StatsWindow,
    finished: &[(NaiveDate, Option<String>)],
    today: NaiveDate,
) -> Vec<ReadCount> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for (date, _) in finished {
        if in_window(window, *date) {
            *counts.entry(bucket_label(window, *date)).or_insert(0) += 1;
        }
    }

    bucket_dates(window, finished, today)
        .into_iter()
        .map(|date| {
            let label = bucket_label(window, date);
            let count = counts.get(&label).copied().unwrap_or(0);
            ReadCount { label, count }
        })
        .collect()
}

/// First date of each bucket the window spans, ascending
fn bucket_dates(
    window: &StatsWindow,
    finished: &[(NaiveDate, Option<String>)],
    today: NaiveDate,
) -> Vec<NaiveDate> {
    match *window {
        StatsWindow::Month { year, month } => (1..=31)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .collect(),
        StatsWindow::Year(year) => (1..=12)
            .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
            .collect(),
        StatsWindow::All => {
            // With nothing finished yet the chart still shows a short span
            let start = finished
                .iter()
                .map(|(date, _)| date.year())
                .min()
                .unwrap_or(today.year() - 1);
            (start..=today.year())
                .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
                .collect()
        }
    }
}

/// Finished-per-genre counts inside the window, largest first
fn build_genre_stats(
    window: &StatsWindow,
    finished: &[(NaiveDate, Option<String>)],
) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for (date, genre) in finished {
        if !in_window(window, *date) {
            continue;
        }
        if let Some(genre) = genre.as_deref() {
            if !genre.is_empty() {
                *counts.entry(genre).or_insert(0) += 1;
            }
        }
    }

    let mut stats: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn finished_on(dates: &[(i32, u32, u32)]) -> Vec<(NaiveDate, Option<String>)> {
        dates
            .iter()
            .map(|&(y, m, d)| (day(y, m, d), Some("Fantasy".to_string())))
            .collect()
    }

    #[test]
    fn test_parse_month_window() {
        assert_eq!(
            parse_window("month", Some("2026-05")).unwrap(),
            StatsWindow::Month { year: 2026, month: 5 }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_window("month", Some("2026-13")),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_window("month", None),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_window("year", Some("soon")),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_window("decade", Some("2020")),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_all_ignores_period() {
        assert_eq!(parse_window("all", None).unwrap(), StatsWindow::All);
        assert_eq!(parse_window("all", Some("2026")).unwrap(), StatsWindow::All);
    }

    #[test]
    fn test_month_view_buckets_every_day() {
        let window = StatsWindow::Month { year: 2026, month: 5 };
        let finished = finished_on(&[(2026, 5, 1), (2026, 5, 1), (2026, 5, 20), (2026, 4, 30)]);

        let stats = build_read_stats(&window, &finished, day(2026, 8, 21));

        assert_eq!(stats.len(), 31);
        assert_eq!(stats[0].label, "1 May");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[19].label, "20 May");
        assert_eq!(stats[19].count, 1);
        // The April finish falls outside the window
        assert_eq!(stats.iter().map(|s| s.count).sum::<i64>(), 3);
    }

    #[test]
    fn test_month_view_respects_month_length() {
        let leap = StatsWindow::Month { year: 2024, month: 2 };
        let plain = StatsWindow::Month { year: 2026, month: 2 };
        let today = day(2026, 8, 21);

        assert_eq!(build_read_stats(&leap, &[], today).len(), 29);
        assert_eq!(build_read_stats(&plain, &[], today).len(), 28);
    }

    #[test]
    fn test_year_view_buckets_every_month() {
        let window = StatsWindow::Year(2026);
        let finished = finished_on(&[(2026, 1, 5), (2026, 1, 25), (2026, 12, 31), (2025, 6, 1)]);

        let stats = build_read_stats(&window, &finished, day(2026, 8, 21));

        assert_eq!(stats.len(), 12);
        assert_eq!(stats[0].label, "January");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[11].label, "December");
        assert_eq!(stats[11].count, 1);
        assert_eq!(stats[5].count, 0);
    }

    #[test]
    fn test_all_view_starts_at_earliest_finish() {
        let window = StatsWindow::All;
        let finished = finished_on(&[(2023, 3, 1), (2026, 1, 1)]);

        let stats = build_read_stats(&window, &finished, day(2026, 8, 21));

        let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2023", "2024", "2025", "2026"]);
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[1].count, 0);
        assert_eq!(stats[3].count, 1);
    }

    #[test]
    fn test_all_view_with_nothing_finished_shows_two_years() {
        let stats = build_read_stats(&StatsWindow::All, &[], day(2026, 8, 21));

        let labels: Vec<&str> = stats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2025", "2026"]);
        assert!(stats.iter().all(|s| s.count == 0));
    }

    #[test]
    fn test_genre_stats_sorted_by_count_then_name() {
        let window = StatsWindow::Year(2026);
        let finished = vec![
            (day(2026, 1, 1), Some("Horror".to_string())),
            (day(2026, 2, 1), Some("Fantasy".to_string())),
            (day(2026, 3, 1), Some("Horror".to_string())),
            (day(2026, 4, 1), Some("Crime".to_string())),
            (day(2026, 5, 1), None),
            (day(2025, 6, 1), Some("Horror".to_string())),
        ];

        let stats = build_genre_stats(&window, &finished);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].genre, "Horror");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].genre, "Crime");
        assert_eq!(stats[2].genre, "Fantasy");
    }

    #[test]
    fn test_tally_entries_counts_statuses_and_genres() {
        let user_id = Uuid::new_v4();
        let entry = |status: Option<ReadingStatus>, genre: Option<&str>| LibraryEntry {
            id: Uuid::new_v4(),
            user_id,
            book: Book::new(
                "T".to_string(),
                "A".to_string(),
                genre.map(str::to_string),
            ),
            status,
            rating: None,
            review: None,
            favorite: false,
            finished_at: None,
            created_at: Utc::now(),
        };

        let entries = vec![
            entry(Some(ReadingStatus::Finished), Some("Fantasy")),
            entry(Some(ReadingStatus::Finished), Some("Fantasy")),
            entry(Some(ReadingStatus::Finished), None),
            entry(Some(ReadingStatus::Reading), Some("Horror")),
            entry(Some(ReadingStatus::WantToRead), None),
            entry(Some(ReadingStatus::Dropped), None),
            entry(None, None),
        ];

        let stats = tally_entries(&entries);

        assert_eq!(stats.books_read, 3);
        assert_eq!(stats.reading_books, 1);
        assert_eq!(stats.planned_books, 1);
        assert_eq!(stats.dropped_books, 1);
        assert_eq!(stats.total_books, 7);
        assert_eq!(stats.top_genres.get("Fantasy"), Some(&2));
        assert_eq!(stats.max_genre_count, 2);
        // Reading a Horror book does not count toward genres until finished
        assert!(stats.top_genres.get("Horror").is_none());
    }
}
