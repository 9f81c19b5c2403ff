use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone};
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    services::RecommendationEngine,
    stores::UserDirectory,
};

/// Local hour at which the nightly refresh fires
const RUN_HOUR: u32 = 3;
/// Hour tried instead when a DST jump removes 03:00 from the day
const DST_FALLBACK_HOUR: u32 = 4;
/// Days scanned ahead before giving up on finding a valid run time
const SCHEDULE_HORIZON_DAYS: u64 = 4;

const SECS_PER_DAY: u64 = 86_400;

/// Refreshes every user's recommendations once per night
///
/// Runs at 03:00 local time. One user's failure is logged and skipped;
/// the loop itself never stops.
pub struct RecommendationScheduler {
    engine: Arc<RecommendationEngine>,
    users: Arc<dyn UserDirectory>,
}

/// Counts reported after each nightly pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub refreshed: usize,
    pub failed: usize,
}

impl RecommendationScheduler {
    pub fn new(engine: Arc<RecommendationEngine>, users: Arc<dyn UserDirectory>) -> Self {
        Self { engine, users }
    }

    /// Moves the scheduler onto a background task that runs until shutdown
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let delay = next_run_delay(&Local::now());
                tracing::info!(
                    seconds_until_run = delay.as_secs(),
                    "Recommendation refresh scheduled"
                );
                tokio::time::sleep(delay).await;
                self.run_once().await;
            }
        })
    }

    /// One full pass over every registered user
    ///
    /// Failures stay inside this method so the nightly loop keeps its next
    /// wakeup no matter what the pass ran into.
    pub async fn run_once(&self) {
        match self.regenerate_all().await {
            Ok(summary) => {
                tracing::info!(
                    refreshed = summary.refreshed,
                    failed = summary.failed,
                    "Nightly recommendation refresh finished"
                );
            }
            Err(error) => {
                tracing::error!(%error, "Nightly recommendation refresh aborted");
            }
        }
    }

    async fn regenerate_all(&self) -> AppResult<RunSummary> {
        let users = self.users.all_users().await?;
        let mut summary = RunSummary::default();

        for user in users {
            match self.engine.generate(user.id).await {
                Ok(()) => summary.refreshed += 1,
                Err(error) => {
                    summary.failed += 1;
                    tracing::error!(
                        username = %user.username,
                        %error,
                        "Skipping user after recommendation failure"
                    );
                }
            }
        }

        Ok(summary)
    }
}

/// Next 03:00 after `now` in `now`'s own timezone
///
/// Walks at most a few days forward so a pathological timezone cannot spin
/// this into an unbounded loop. On a spring-forward day where 03:00 does not
/// exist, the run slides to 04:00; an ambiguous fall-back 03:00 resolves to
/// its first occurrence.
fn next_run_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();

    for days_ahead in 0..SCHEDULE_HORIZON_DAYS {
        let Some(date) = today.checked_add_days(Days::new(days_ahead)) else {
            continue;
        };
        for hour in [RUN_HOUR, DST_FALLBACK_HOUR] {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            match tz.from_local_datetime(&naive).earliest() {
                Some(at) if at > *now => return Some(at),
                // The hour exists but already passed; this day is done
                Some(_) => break,
                // Skipped by a DST jump; try the fallback hour
                None => continue,
            }
        }
    }
    None
}

/// Sleep duration until the next run, defaulting to a day on clock anomalies
fn next_run_delay<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    match next_run_at(now) {
        Some(at) => (at - now.clone())
            .to_std()
            .unwrap_or(Duration::from_secs(SECS_PER_DAY)),
        None => Duration::from_secs(SECS_PER_DAY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::User;
    use crate::stores::{MockLibraryStore, MockRecommendationStore, MockUserDirectory};
    use chrono::Utc;
    use uuid::Uuid;

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            created_at: Utc::now(),
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).single().unwrap()
    }

    #[test]
    fn test_next_run_is_today_before_three() {
        let now = at(1, 0);
        let next = next_run_at(&now).unwrap();
        assert_eq!(next, at(3, 0));
        assert_eq!(next_run_delay(&now), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow_at_exactly_three() {
        let now = at(3, 0);
        let next = next_run_at(&now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 11, 3, 0, 0).single().unwrap());
        assert_eq!(next_run_delay(&now), Duration::from_secs(SECS_PER_DAY));
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow_after_three() {
        let now = at(10, 0);
        let next = next_run_at(&now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 11, 3, 0, 0).single().unwrap());
        assert_eq!(next_run_delay(&now), Duration::from_secs(17 * 3600));
    }

    #[test]
    fn test_delay_is_always_positive() {
        for hour in 0..24 {
            let delay = next_run_delay(&at(hour, 30));
            assert!(delay > Duration::ZERO, "zero delay at hour {hour}");
            assert!(delay <= Duration::from_secs(SECS_PER_DAY));
        }
    }

    fn scheduler(
        library: MockLibraryStore,
        recommendations: MockRecommendationStore,
        users: MockUserDirectory,
    ) -> RecommendationScheduler {
        let engine = RecommendationEngine::new(Arc::new(library), Arc::new(recommendations));
        RecommendationScheduler::new(Arc::new(engine), Arc::new(users))
    }

    #[tokio::test]
    async fn test_pass_continues_after_one_user_fails() {
        let broken = user("broken");
        let healthy = user("healthy");
        let broken_id = broken.id;
        let healthy_id = healthy.id;

        let mut users = MockUserDirectory::new();
        users
            .expect_all_users()
            .return_once(move || Ok(vec![broken, healthy]));

        let mut library = MockLibraryStore::new();
        library.expect_finished_by_user().returning(move |user_id| {
            if user_id == broken_id {
                Err(AppError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(vec![])
            }
        });
        library.expect_all_by_user().returning(|_| Ok(vec![]));

        let mut recommendations = MockRecommendationStore::new();
        // Only the healthy user's set gets replaced
        recommendations
            .expect_replace_for_user()
            .withf(move |user_id, recs| *user_id == healthy_id && recs.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let summary = scheduler(library, recommendations, users)
            .regenerate_all()
            .await
            .unwrap();

        assert_eq!(summary, RunSummary { refreshed: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_pass_aborts_when_directory_is_down() {
        let mut users = MockUserDirectory::new();
        users
            .expect_all_users()
            .return_once(|| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let library = MockLibraryStore::new();
        let recommendations = MockRecommendationStore::new();

        let result = scheduler(library, recommendations, users)
            .regenerate_all()
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_run_once_swallows_directory_failure() {
        let mut users = MockUserDirectory::new();
        users
            .expect_all_users()
            .return_once(|| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        // Must return rather than propagate or panic
        scheduler(MockLibraryStore::new(), MockRecommendationStore::new(), users)
            .run_once()
            .await;
    }
}
