use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Recommendation, RecommendedBook},
    stores::{LibraryStore, RecommendationStore},
};

/// Weight applied to the number of finished books sharing a candidate's genre
const GENRE_WEIGHT: f64 = 0.8;
/// Maximum contribution of the community rating to a candidate's score
const RATING_WEIGHT: f64 = 4.0;
/// Rating assumed for a book nobody has rated yet
const DEFAULT_RATING: f64 = 5.0;
/// Ratings run from 1 to 10; dividing by this normalizes them to 0..1
const RATING_SCALE: f64 = 10.0;

/// Scores and stores book suggestions for individual readers
///
/// Suggestions come from genre affinity: the more books a reader has finished
/// in a genre, the more that genre's unread catalog books are pushed up, with
/// the community's average rating as a tiebreaker. Each run discards the
/// reader's previous suggestions and writes a fresh set.
pub struct RecommendationEngine {
    library: Arc<dyn LibraryStore>,
    recommendations: Arc<dyn RecommendationStore>,
}

impl RecommendationEngine {
    pub fn new(
        library: Arc<dyn LibraryStore>,
        recommendations: Arc<dyn RecommendationStore>,
    ) -> Self {
        Self {
            library,
            recommendations,
        }
    }

    /// Regenerates the stored recommendation set for one user
    ///
    /// Replaces whatever was stored before; a failure partway through leaves
    /// the previous set untouched because the replace step is a single
    /// all-or-nothing store call.
    pub async fn generate(&self, user_id: Uuid) -> AppResult<()> {
        // 1. Count finished books per genre; genre-less books carry no signal
        let finished = self.library.finished_by_user(user_id).await?;
        let mut genre_counts: HashMap<String, usize> = HashMap::new();
        for entry in &finished {
            if let Some(genre) = entry.book.genre.as_deref() {
                if !genre.is_empty() {
                    *genre_counts.entry(genre.to_string()).or_insert(0) += 1;
                }
            }
        }

        // 2. Books already on the shelf are never recommended, whatever their status
        let owned: HashSet<Uuid> = self
            .library
            .all_by_user(user_id)
            .await?
            .iter()
            .map(|entry| entry.book.id)
            .collect();

        // 3. Score one candidate per (genre, catalog book) pair. A book the
        //    catalog returns under several finished genres is scored once per
        //    genre; the duplicates are kept.
        let mut candidates = Vec::new();
        for (genre, count) in &genre_counts {
            let books = self.library.books_by_genre(genre).await?;
            for book in books {
                if owned.contains(&book.id) {
                    continue;
                }
                let ratings = self.library.ratings_for_book(book.id).await?;
                let average = if ratings.is_empty() {
                    DEFAULT_RATING
                } else {
                    ratings.iter().sum::<i32>() as f64 / ratings.len() as f64
                };
                let score = candidate_score(*count, average);
                candidates.push(Recommendation::new(user_id, book.id, score));
            }
        }

        // 4. Highest score first, then swap the stored set in one step
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        self.recommendations
            .replace_for_user(user_id, &candidates)
            .await?;

        tracing::info!(
            user_id = %user_id,
            genres = genre_counts.len(),
            candidates = candidates.len(),
            "Recommendations regenerated"
        );
        Ok(())
    }

    /// Returns the user's stored recommendations, highest score first
    ///
    /// Books the user has shelved since the last generation run are filtered
    /// out here, so a stale stored set never resurfaces a book the user
    /// already picked up.
    pub async fn fetch(&self, user_id: Uuid) -> AppResult<Vec<RecommendedBook>> {
        let owned: HashSet<Uuid> = self
            .library
            .all_by_user(user_id)
            .await?
            .iter()
            .map(|entry| entry.book.id)
            .collect();

        let stored = self.recommendations.find_by_user(user_id).await?;
        Ok(stored
            .into_iter()
            .filter(|rec| !owned.contains(&rec.book.id))
            .collect())
    }

    /// Marks one recommendation as read on behalf of its owner
    pub async fn mark_read(&self, recommendation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let recommendation = self
            .recommendations
            .find_by_id(recommendation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))?;

        if recommendation.user_id != user_id {
            return Err(AppError::AccessDenied(
                "Recommendation belongs to another user".to_string(),
            ));
        }

        self.recommendations.mark_read(recommendation_id).await
    }
}

/// Scores one candidate book for one genre the user has finished books in
fn candidate_score(finished_in_genre: usize, average_rating: f64) -> f64 {
    let genre_score = finished_in_genre as f64 * GENRE_WEIGHT;
    let rating_score = (average_rating / RATING_SCALE) * RATING_WEIGHT;
    genre_score + rating_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, LibraryEntry, ReadingStatus};
    use crate::stores::{MockLibraryStore, MockRecommendationStore};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn book_in(genre: Option<&str>) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            genre: genre.map(str::to_string),
            cover_url: None,
            created_at: Utc::now(),
        }
    }

    fn entry(user_id: Uuid, book: Book, status: Option<ReadingStatus>) -> LibraryEntry {
        LibraryEntry {
            id: Uuid::new_v4(),
            user_id,
            book,
            status,
            rating: None,
            review: None,
            favorite: false,
            finished_at: None,
            created_at: Utc::now(),
        }
    }

    fn recommended(user_id: Uuid, book: Book, score: f64) -> RecommendedBook {
        RecommendedBook {
            id: Uuid::new_v4(),
            book,
            score,
            read: false,
            created_at: Utc::now(),
        }
    }

    fn engine(
        library: MockLibraryStore,
        recommendations: MockRecommendationStore,
    ) -> RecommendationEngine {
        RecommendationEngine::new(Arc::new(library), Arc::new(recommendations))
    }

    #[test]
    fn test_score_for_unrated_book_uses_default_rating() {
        // 2 finished in genre, default rating 5.0: 1.6 + 2.0
        assert_eq!(candidate_score(2, DEFAULT_RATING), 3.6);
    }

    #[test]
    fn test_score_monotonic_in_rating() {
        let low = candidate_score(3, 4.0);
        let high = candidate_score(3, 9.0);
        assert!(high > low);
    }

    #[test]
    fn test_score_monotonic_in_genre_count() {
        let few = candidate_score(1, 7.0);
        let many = candidate_score(5, 7.0);
        assert!(many > few);
    }

    #[tokio::test]
    async fn test_generate_single_genre_excludes_shelved_books() {
        // The user finished 2 Fantasy books; the catalog has 3 Fantasy books,
        // one of which is already on the shelf. Expect exactly 2 unrated
        // candidates, each scoring 1.6 + 2.0.
        let user_id = Uuid::new_v4();
        let finished_a = book_in(Some("Fantasy"));
        let finished_b = book_in(Some("Fantasy"));
        let fresh_a = book_in(Some("Fantasy"));
        let fresh_b = book_in(Some("Fantasy"));
        let fresh_ids = [fresh_a.id, fresh_b.id];

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished = vec![
            entry(user_id, finished_a.clone(), Some(ReadingStatus::Finished)),
            entry(user_id, finished_b.clone(), Some(ReadingStatus::Finished)),
        ];
        let all = finished.clone();
        library
            .expect_finished_by_user()
            .with(eq(user_id))
            .return_once(move |_| Ok(finished));
        library
            .expect_all_by_user()
            .with(eq(user_id))
            .return_once(move |_| Ok(all));
        let catalog = vec![fresh_a, fresh_b, finished_a];
        library
            .expect_books_by_genre()
            .with(eq("Fantasy"))
            .return_once(move |_| Ok(catalog));
        library
            .expect_ratings_for_book()
            .times(2)
            .returning(|_| Ok(vec![]));

        recommendations
            .expect_replace_for_user()
            .withf(move |uid, recs| {
                *uid == user_id
                    && recs.len() == 2
                    && recs.iter().all(|r| r.score == 3.6 && !r.read)
                    && recs.iter().all(|r| fresh_ids.contains(&r.book_id))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_blends_community_rating_into_score() {
        let user_id = Uuid::new_v4();
        let finished = book_in(Some("Horror"));
        let candidate = book_in(Some("Horror"));
        let candidate_id = candidate.id;

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished_entries = vec![entry(user_id, finished.clone(), Some(ReadingStatus::Finished))];
        let all = finished_entries.clone();
        library
            .expect_finished_by_user()
            .return_once(move |_| Ok(finished_entries));
        library.expect_all_by_user().return_once(move |_| Ok(all));
        library
            .expect_books_by_genre()
            .with(eq("Horror"))
            .return_once(move |_| Ok(vec![candidate]));
        library
            .expect_ratings_for_book()
            .with(eq(candidate_id))
            .return_once(|_| Ok(vec![8, 6]));

        // 1 finished in genre, average rating 7.0: 0.8 + 2.8
        recommendations
            .expect_replace_for_user()
            .withf(|_, recs| recs.len() == 1 && (recs[0].score - 3.6).abs() < 1e-9)
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_orders_candidates_by_score_descending() {
        // Two genres with different finished counts, so the two candidates
        // land at different scores and must arrive sorted.
        let user_id = Uuid::new_v4();
        let fantasy_a = book_in(Some("Fantasy"));
        let fantasy_b = book_in(Some("Fantasy"));
        let horror = book_in(Some("Horror"));
        let fantasy_pick = book_in(Some("Fantasy"));
        let horror_pick = book_in(Some("Horror"));
        let fantasy_pick_id = fantasy_pick.id;
        let horror_pick_id = horror_pick.id;

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished = vec![
            entry(user_id, fantasy_a, Some(ReadingStatus::Finished)),
            entry(user_id, fantasy_b, Some(ReadingStatus::Finished)),
            entry(user_id, horror, Some(ReadingStatus::Finished)),
        ];
        let all = finished.clone();
        library
            .expect_finished_by_user()
            .return_once(move |_| Ok(finished));
        library.expect_all_by_user().return_once(move |_| Ok(all));
        library
            .expect_books_by_genre()
            .with(eq("Fantasy"))
            .return_once(move |_| Ok(vec![fantasy_pick]));
        library
            .expect_books_by_genre()
            .with(eq("Horror"))
            .return_once(move |_| Ok(vec![horror_pick]));
        library.expect_ratings_for_book().returning(|_| Ok(vec![]));

        // Fantasy: 2 * 0.8 + 2.0 = 3.6; Horror: 0.8 + 2.0 = 2.8
        recommendations
            .expect_replace_for_user()
            .withf(move |_, recs| {
                recs.len() == 2
                    && recs[0].book_id == fantasy_pick_id
                    && recs[0].score == 3.6
                    && recs[1].book_id == horror_pick_id
                    && recs[1].score == 2.8
            })
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_keeps_one_candidate_per_genre_book_pair() {
        // A catalog quirk can return the same book for two finished genres.
        // The engine scores it once per genre and stores both rows.
        let user_id = Uuid::new_v4();
        let fantasy = book_in(Some("Fantasy"));
        let scifi = book_in(Some("Sci-Fi"));
        let crossover = book_in(Some("Fantasy"));
        let crossover_id = crossover.id;
        let crossover_for_scifi = crossover.clone();

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished = vec![
            entry(user_id, fantasy, Some(ReadingStatus::Finished)),
            entry(user_id, scifi, Some(ReadingStatus::Finished)),
        ];
        let all = finished.clone();
        library
            .expect_finished_by_user()
            .return_once(move |_| Ok(finished));
        library.expect_all_by_user().return_once(move |_| Ok(all));
        library
            .expect_books_by_genre()
            .with(eq("Fantasy"))
            .return_once(move |_| Ok(vec![crossover]));
        library
            .expect_books_by_genre()
            .with(eq("Sci-Fi"))
            .return_once(move |_| Ok(vec![crossover_for_scifi]));
        library.expect_ratings_for_book().returning(|_| Ok(vec![]));

        recommendations
            .expect_replace_for_user()
            .withf(move |_, recs| {
                recs.len() == 2 && recs.iter().all(|r| r.book_id == crossover_id)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_with_no_finished_books_stores_empty_set() {
        // No finished books means no genre signal; the previous set is still
        // replaced, leaving the user with zero recommendations.
        let user_id = Uuid::new_v4();
        let shelved = book_in(Some("Fantasy"));

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        library.expect_finished_by_user().return_once(|_| Ok(vec![]));
        let all = vec![entry(user_id, shelved, Some(ReadingStatus::Reading))];
        library.expect_all_by_user().return_once(move |_| Ok(all));

        recommendations
            .expect_replace_for_user()
            .withf(|_, recs| recs.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_ignores_genreless_finished_books() {
        let user_id = Uuid::new_v4();
        let no_genre = book_in(None);
        let blank_genre = book_in(Some(""));

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished = vec![
            entry(user_id, no_genre, Some(ReadingStatus::Finished)),
            entry(user_id, blank_genre, Some(ReadingStatus::Finished)),
        ];
        let all = finished.clone();
        library
            .expect_finished_by_user()
            .return_once(move |_| Ok(finished));
        library.expect_all_by_user().return_once(move |_| Ok(all));

        recommendations
            .expect_replace_for_user()
            .withf(|_, recs| recs.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        engine(library, recommendations)
            .generate(user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_twice_produces_identical_scores() {
        // Same library, same catalog: both runs must hand the store the same
        // (book, score) multiset even though row ids differ.
        let user_id = Uuid::new_v4();
        let finished = book_in(Some("Fantasy"));
        let pick_a = book_in(Some("Fantasy"));
        let pick_b = book_in(Some("Fantasy"));
        let expected = [(pick_a.id, 4.8), (pick_b.id, 2.8)];

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let finished_entries = vec![entry(user_id, finished.clone(), Some(ReadingStatus::Finished))];
        let all = finished_entries.clone();
        library
            .expect_finished_by_user()
            .times(2)
            .returning(move |_| Ok(finished_entries.clone()));
        library
            .expect_all_by_user()
            .times(2)
            .returning(move |_| Ok(all.clone()));
        let catalog = vec![pick_a.clone(), pick_b.clone()];
        library
            .expect_books_by_genre()
            .times(2)
            .returning(move |_| Ok(catalog.clone()));
        let rated = pick_a.id;
        library
            .expect_ratings_for_book()
            .times(4)
            .returning(move |book_id| if book_id == rated { Ok(vec![10]) } else { Ok(vec![]) });

        recommendations
            .expect_replace_for_user()
            .withf(move |_, recs| {
                let mut got: Vec<(Uuid, f64)> =
                    recs.iter().map(|r| (r.book_id, r.score)).collect();
                got.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                got == expected
            })
            .times(2)
            .returning(|_, _| Ok(()));

        let engine = engine(library, recommendations);
        engine.generate(user_id).await.unwrap();
        engine.generate(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_filters_books_shelved_after_generation() {
        // One recommended book landed on the shelf after the nightly run; it
        // must not come back even though its row is still stored.
        let user_id = Uuid::new_v4();
        let still_fresh = book_in(Some("Fantasy"));
        let now_shelved = book_in(Some("Fantasy"));
        let fresh_id = still_fresh.id;

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        let shelf = vec![entry(user_id, now_shelved.clone(), Some(ReadingStatus::Reading))];
        library.expect_all_by_user().return_once(move |_| Ok(shelf));
        let stored = vec![
            recommended(user_id, still_fresh, 3.6),
            recommended(user_id, now_shelved, 2.8),
        ];
        library.expect_finished_by_user().never();
        recommendations
            .expect_find_by_user()
            .with(eq(user_id))
            .return_once(move |_| Ok(stored));

        let result = engine(library, recommendations).fetch(user_id).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].book.id, fresh_id);
    }

    #[tokio::test]
    async fn test_fetch_preserves_store_ordering() {
        let user_id = Uuid::new_v4();

        let mut library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();

        library.expect_all_by_user().return_once(|_| Ok(vec![]));
        let stored = vec![
            recommended(user_id, book_in(Some("Fantasy")), 4.2),
            recommended(user_id, book_in(Some("Fantasy")), 3.6),
            recommended(user_id, book_in(Some("Horror")), 2.8),
        ];
        recommendations
            .expect_find_by_user()
            .return_once(move |_| Ok(stored));

        let result = engine(library, recommendations).fetch(user_id).await.unwrap();

        let scores: Vec<f64> = result.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![4.2, 3.6, 2.8]);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id_is_not_found() {
        let library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();
        recommendations.expect_find_by_id().return_once(|_| Ok(None));

        let result = engine(library, recommendations)
            .mark_read(Uuid::new_v4(), Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_read_rejects_other_users_recommendation() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let recommendation = Recommendation::new(owner, Uuid::new_v4(), 3.6);
        let recommendation_id = recommendation.id;

        let library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();
        recommendations
            .expect_find_by_id()
            .with(eq(recommendation_id))
            .return_once(move |_| Ok(Some(recommendation)));
        // The read flag must stay untouched on a denied request
        recommendations.expect_mark_read().never();

        let result = engine(library, recommendations)
            .mark_read(recommendation_id, intruder)
            .await;

        assert!(matches!(result, Err(AppError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_mark_read_flips_flag_for_owner() {
        let owner = Uuid::new_v4();
        let recommendation = Recommendation::new(owner, Uuid::new_v4(), 3.6);
        let recommendation_id = recommendation.id;

        let library = MockLibraryStore::new();
        let mut recommendations = MockRecommendationStore::new();
        recommendations
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(recommendation)));
        recommendations
            .expect_mark_read()
            .with(eq(recommendation_id))
            .times(1)
            .returning(|_| Ok(()));

        engine(library, recommendations)
            .mark_read(recommendation_id, owner)
            .await
            .unwrap();
    }
}
